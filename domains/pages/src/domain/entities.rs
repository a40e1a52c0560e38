//! Domain entities for the pages engine
//!
//! This module contains the entities behind a project's published site:
//! the project itself, its deployments, and the custom domains bound to it.
//! Each entity includes proper validation, serialization, and business rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pagedock_common::{Error, Result};

use crate::domain::state::DeploymentState;

/// Maximum length of a project name
pub const MAX_PROJECT_NAME_LEN: usize = 200;

/// Maximum total length of a hostname, per RFC 1035
pub const MAX_HOSTNAME_LEN: usize = 253;

/// Maximum length of one hostname label
pub const MAX_LABEL_LEN: usize = 63;

/// Kind of namespace a project lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "namespace_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NamespaceKind {
    #[default]
    User,
    Group,
}

impl std::fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NamespaceKind::User => write!(f, "user"),
            NamespaceKind::Group => write!(f, "group"),
        }
    }
}

/// Opaque caller identity, resolved by an external collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
}

impl Actor {
    pub fn new(id: Uuid) -> Self {
        Actor { id }
    }
}

/// Project entity
///
/// A project owns at most one published site. The active deployment is an
/// explicit pointer to the Deployment record whose content is currently
/// served; it is mutated only inside the per-project exclusive section of
/// the deployment service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub namespace_id: Uuid,
    pub namespace_kind: NamespaceKind,
    /// Owner of the namespace: the user itself, or the group's owner for
    /// group namespaces. This is the effective owner for removal checks.
    pub namespace_owner_id: Uuid,
    pub active_deployment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new project with validation
    pub fn new(
        name: String,
        namespace_id: Uuid,
        namespace_kind: NamespaceKind,
        namespace_owner_id: Uuid,
    ) -> Result<Self> {
        if name.is_empty() || name.len() > MAX_PROJECT_NAME_LEN {
            return Err(Error::Validation(
                "Project name must be 1-200 characters".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Project {
            id: Uuid::new_v4(),
            name,
            namespace_id,
            namespace_kind,
            namespace_owner_id,
            active_deployment_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether this project currently serves published content
    pub fn pages_deployed(&self) -> bool {
        self.active_deployment_id.is_some()
    }

    /// Resting deployment state derived from the active pointer
    pub fn deployment_state(&self) -> DeploymentState {
        if self.pages_deployed() {
            DeploymentState::Deployed
        } else {
            DeploymentState::NoDeployment
        }
    }

    /// The actor allowed to remove this project's published content
    pub fn effective_owner_id(&self) -> Uuid {
        self.namespace_owner_id
    }

    /// Validate invariants
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.len() > MAX_PROJECT_NAME_LEN {
            return Err(Error::Validation(
                "Project name must be 1-200 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one publish attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "deployment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Success,
    Failed,
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentStatus::Success => write!(f, "success"),
            DeploymentStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Deployment entity - one publish attempt for a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Deployment {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Source build/commit identifier the artifact was produced from
    pub commit_sha: String,
    pub archive_path: String,
    pub metadata_path: String,
    pub status: DeploymentStatus,
    pub failure_reason: Option<String>,
    /// Total uncompressed size of the extracted site, 0 for failures
    pub size_bytes: i64,
    pub entry_count: i32,
    /// Hex SHA-256 of the archive file, recorded on success
    pub digest: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl Deployment {
    /// Record a successful publish
    pub fn success(
        project_id: Uuid,
        commit_sha: String,
        archive_path: String,
        metadata_path: String,
        size_bytes: i64,
        entry_count: i32,
        digest: String,
    ) -> Self {
        let now = Utc::now();
        Deployment {
            id: Uuid::new_v4(),
            project_id,
            commit_sha,
            archive_path,
            metadata_path,
            status: DeploymentStatus::Success,
            failure_reason: None,
            size_bytes,
            entry_count,
            digest: Some(digest),
            created_at: now,
            finished_at: now,
        }
    }

    /// Record a failed publish attempt
    pub fn failure(
        project_id: Uuid,
        commit_sha: String,
        archive_path: String,
        metadata_path: String,
        reason: String,
    ) -> Self {
        let now = Utc::now();
        Deployment {
            id: Uuid::new_v4(),
            project_id,
            commit_sha,
            archive_path,
            metadata_path,
            status: DeploymentStatus::Failed,
            failure_reason: Some(reason),
            size_bytes: 0,
            entry_count: 0,
            digest: None,
            created_at: now,
            finished_at: now,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeploymentStatus::Success
    }

    /// Validate invariants
    pub fn validate(&self) -> Result<()> {
        if self.commit_sha.is_empty() {
            return Err(Error::Validation(
                "Deployment must reference a source commit".to_string(),
            ));
        }

        match self.status {
            DeploymentStatus::Failed if self.failure_reason.is_none() => {
                return Err(Error::Validation(
                    "Failed deployment must carry a failure reason".to_string(),
                ));
            }
            DeploymentStatus::Success if self.failure_reason.is_some() => {
                return Err(Error::Validation(
                    "Successful deployment cannot carry a failure reason".to_string(),
                ));
            }
            _ => {}
        }

        if self.size_bytes < 0 {
            return Err(Error::Validation(
                "Deployment size cannot be negative".to_string(),
            ));
        }

        if self.entry_count < 0 {
            return Err(Error::Validation(
                "Deployment entry count cannot be negative".to_string(),
            ));
        }

        Ok(())
    }
}

/// Custom domain entity - a hostname bound to a project's published site
///
/// The hostname is unique across the whole system, not per project.
/// Certificate material is either fully present (certificate and matching
/// private key) or fully absent; a half-supplied pair never persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PagesDomain {
    pub id: Uuid,
    pub project_id: Uuid,
    pub hostname: String,
    pub certificate_pem: Option<String>,
    pub certificate_key_pem: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PagesDomain {
    /// Create a new domain record with validation
    ///
    /// Certificate consistency (key matches certificate) is checked by the
    /// registry before persistence; this constructor enforces the lexical
    /// hostname rules and the both-or-neither pair invariant.
    pub fn new(
        project_id: Uuid,
        hostname: String,
        certificate_pem: Option<String>,
        certificate_key_pem: Option<String>,
    ) -> Result<Self> {
        Self::validate_hostname(&hostname)?;

        if certificate_pem.is_some() != certificate_key_pem.is_some() {
            return Err(Error::Validation(
                "Certificate and private key must be supplied together".to_string(),
            ));
        }

        Ok(PagesDomain {
            id: Uuid::new_v4(),
            project_id,
            hostname,
            certificate_pem,
            certificate_key_pem,
            created_at: Utc::now(),
        })
    }

    /// Validate hostname lexical rules
    ///
    /// Only lexical constraints are enforced here; DNS resolvability is
    /// outside this component's scope.
    pub fn validate_hostname(hostname: &str) -> Result<()> {
        if hostname.is_empty() || hostname.len() > MAX_HOSTNAME_LEN {
            return Err(Error::Validation(
                "Hostname must be 1-253 characters".to_string(),
            ));
        }

        let labels: Vec<&str> = hostname.split('.').collect();
        if labels.len() < 2 {
            return Err(Error::Validation(
                "Hostname must contain at least two labels".to_string(),
            ));
        }

        for label in labels {
            if label.is_empty() || label.len() > MAX_LABEL_LEN {
                return Err(Error::Validation(
                    "Hostname labels must be 1-63 characters".to_string(),
                ));
            }

            if !label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            {
                return Err(Error::Validation(
                    "Hostname labels must contain only lowercase letters, numbers, and hyphens"
                        .to_string(),
                ));
            }

            if label.starts_with('-') || label.ends_with('-') {
                return Err(Error::Validation(
                    "Hostname labels cannot start or end with a hyphen".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Whether this domain carries certificate material
    pub fn has_certificate(&self) -> bool {
        self.certificate_pem.is_some()
    }

    /// Validate invariants
    pub fn validate(&self) -> Result<()> {
        Self::validate_hostname(&self.hostname)?;

        if self.certificate_pem.is_some() != self.certificate_key_pem.is_some() {
            return Err(Error::Validation(
                "Certificate and private key must be present together".to_string(),
            ));
        }

        Ok(())
    }
}
