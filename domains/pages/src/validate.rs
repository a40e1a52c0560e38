//! Validation gate for build artifacts
//!
//! Runs to completion before the publisher touches the filesystem; no
//! partial extraction is ever attempted for content that will be rejected.

use pagedock_common::{Error, RejectReason, Result};

use crate::archive::ArchiveReader;

/// Entry that must exist at the archive's logical root for the site to be
/// servable
pub const ROOT_INDEX_ENTRY: &str = "index.html";

/// Limits applied to a candidate site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteLimits {
    /// Maximum total uncompressed size, in bytes
    pub max_total_size: u64,
}

impl SiteLimits {
    pub fn new(max_total_size: u64) -> Self {
        SiteLimits { max_total_size }
    }
}

impl Default for SiteLimits {
    fn default() -> Self {
        SiteLimits {
            max_total_size: pagedock_common::config::DEFAULT_MAX_SITE_SIZE_BYTES,
        }
    }
}

/// Validate an opened artifact pair against the limits
///
/// Pure check with no side effects. Runs in order, short-circuiting on the
/// first failure:
/// 1. archive and metadata index agree structurally,
/// 2. total uncompressed size is within the limit,
/// 3. the root index document exists.
pub fn validate(reader: &ArchiveReader, limits: &SiteLimits) -> Result<()> {
    if reader.verify_structure().is_err() {
        return Err(Error::Rejected(RejectReason::Corrupt));
    }

    if reader.total_size() > limits.max_total_size {
        return Err(Error::Rejected(RejectReason::TooLarge));
    }

    if !reader.entry_exists(ROOT_INDEX_ENTRY) {
        return Err(Error::Rejected(RejectReason::MissingRoot));
    }

    Ok(())
}
