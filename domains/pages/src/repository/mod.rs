//! Persistence layer for pages entities
//!
//! Store traits with two implementations: Postgres-backed repositories for
//! production and an in-memory store for tests and embedders without a
//! database. Both uphold the same invariants: global hostname uniqueness
//! and the at-most-one-active-deployment pointer.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use pagedock_common::Result;

use crate::domain::entities::{Deployment, PagesDomain, Project};

pub use memory::InMemoryStore;
pub use postgres::{PgDeploymentStore, PgDomainStore, PgProjectStore};

/// Storage for projects and their active-deployment pointer
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn insert(&self, project: &Project) -> Result<()>;

    async fn get(&self, project_id: Uuid) -> Result<Option<Project>>;

    /// Mutate the active-deployment pointer. Only called from inside the
    /// deployment service's per-project exclusive section.
    async fn set_active_deployment(
        &self,
        project_id: Uuid,
        deployment_id: Option<Uuid>,
    ) -> Result<()>;
}

/// Storage for deployment records
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    async fn insert(&self, deployment: &Deployment) -> Result<()>;

    async fn get(&self, deployment_id: Uuid) -> Result<Option<Deployment>>;

    /// Delete a record; `NotFound` when absent
    async fn delete(&self, deployment_id: Uuid) -> Result<()>;

    /// All records for a project in creation order
    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Deployment>>;
}

/// Storage for custom domain records
#[async_trait]
pub trait DomainStore: Send + Sync {
    /// Insert a record; `DuplicateHostname` when the hostname is taken by
    /// any project, in which case nothing is persisted
    async fn insert(&self, domain: &PagesDomain) -> Result<()>;

    async fn get(&self, domain_id: Uuid) -> Result<Option<PagesDomain>>;

    async fn find_by_hostname(&self, hostname: &str) -> Result<Option<PagesDomain>>;

    /// A project's domains in creation order
    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<PagesDomain>>;

    /// Delete a record; `NotFound` when absent
    async fn delete(&self, domain_id: Uuid) -> Result<()>;

    /// Cascade used when the owning project is destroyed; returns the
    /// number of removed records
    async fn delete_for_project(&self, project_id: Uuid) -> Result<u64>;
}
