//! Common error types and handling for Pagedock

use serde::{Deserialize, Serialize};

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Reason a build artifact was rejected during validation.
///
/// Validation is a pure gate: whichever reason is produced, no filesystem
/// or store mutation has occurred yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Archive or metadata index could not be parsed, or they disagree
    Corrupt,
    /// Total uncompressed size exceeds the configured maximum
    TooLarge,
    /// The root index document is missing from the archive
    MissingRoot,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Corrupt => write!(f, "corrupt"),
            RejectReason::TooLarge => write!(f, "too_large"),
            RejectReason::MissingRoot => write!(f, "missing_root"),
        }
    }
}

/// Common error type for the Pagedock engine
///
/// Every variant is a recoverable, typed outcome reported to the caller;
/// nothing here is fatal to the process. Failure paths either leave prior
/// committed state untouched or leave no new record at all.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("deployment rejected: {0}")]
    Rejected(RejectReason),

    #[error("deployment I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("hostname has already been taken: {0}")]
    DuplicateHostname(String),

    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    #[error("malformed private key: {0}")]
    MalformedKey(String),

    #[error("private key does not match certificate")]
    KeyCertificateMismatch,

    #[error("only the project owner can remove pages")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the stable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::CorruptArchive(_) => "CORRUPT_ARCHIVE",
            Error::Rejected(RejectReason::Corrupt) => "REJECTED_CORRUPT",
            Error::Rejected(RejectReason::TooLarge) => "REJECTED_TOO_LARGE",
            Error::Rejected(RejectReason::MissingRoot) => "REJECTED_MISSING_ROOT",
            Error::Io(_) => "IO_FAILURE",
            Error::DuplicateHostname(_) => "DUPLICATE_HOSTNAME",
            Error::MalformedCertificate(_) => "MALFORMED_CERTIFICATE",
            Error::MalformedKey(_) => "MALFORMED_KEY",
            Error::KeyCertificateMismatch => "KEY_CERTIFICATE_MISMATCH",
            Error::Forbidden => "FORBIDDEN",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error was produced by the validation gate, before any
    /// filesystem mutation was attempted
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::CorruptArchive(_) | Error::Rejected(_))
    }
}
