//! Pages domain: artifact deployment, atomic publishing, custom domains
//!
//! The engine that turns a CI build artifact (compressed archive plus
//! metadata index) into atomically-published static site content, and the
//! registry that binds custom hostnames and TLS certificate material to a
//! project's published site.

pub mod archive;
pub mod certificate;
pub mod domain;
pub mod publish;
pub mod registry;
pub mod repository;
pub mod service;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export domain types at the crate root for convenience
pub use domain::entities::*;
pub use domain::state::{
    DeploymentEvent, DeploymentGuardContext, DeploymentState, DeploymentStateMachine, StateError,
};
// Re-export engine types
pub use archive::{ArchiveReader, MetadataIndex};
pub use certificate::validate_pair;
pub use publish::{Publisher, StagedSite};
pub use registry::DomainRegistry;
pub use repository::{
    DeploymentStore, DomainStore, InMemoryStore, PgDeploymentStore, PgDomainStore, PgProjectStore,
    ProjectStore,
};
pub use service::{BuildRef, DeploymentService, NamespaceOwnership, OwnershipPolicy};
pub use validate::{validate, SiteLimits, ROOT_INDEX_ENTRY};
