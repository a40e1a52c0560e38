//! Custom domain registry
//!
//! Binds externally reachable hostnames, and optionally TLS certificate
//! material, to a project's published site. Hostname uniqueness is global;
//! certificate pairs are validated before anything is persisted. Domains
//! have their own lifecycle: they survive deployment removal and are only
//! destroyed explicitly or when the owning project is.

use std::sync::Arc;

use uuid::Uuid;

use pagedock_common::Result;

use crate::certificate;
use crate::domain::entities::{PagesDomain, Project};
use crate::repository::DomainStore;

/// Create/list/remove custom hostnames bound to a project
#[derive(Clone)]
pub struct DomainRegistry {
    domains: Arc<dyn DomainStore>,
}

impl DomainRegistry {
    pub fn new(domains: Arc<dyn DomainStore>) -> Self {
        DomainRegistry { domains }
    }

    /// Bind a hostname to a project, optionally with certificate material
    ///
    /// Fails with `DuplicateHostname` when the hostname is taken by any
    /// project, and with the certificate taxonomy when a supplied pair is
    /// malformed or inconsistent. Every failure path leaves no record.
    pub async fn create(
        &self,
        project: &Project,
        hostname: &str,
        certificate_pem: Option<&str>,
        certificate_key_pem: Option<&str>,
    ) -> Result<PagesDomain> {
        let domain = PagesDomain::new(
            project.id,
            hostname.to_string(),
            certificate_pem.map(str::to_string),
            certificate_key_pem.map(str::to_string),
        )?;

        if let (Some(cert), Some(key)) = (certificate_pem, certificate_key_pem) {
            certificate::validate_pair(cert, key)?;
        }

        self.domains.insert(&domain).await?;

        tracing::info!(
            project_id = %project.id,
            hostname = %domain.hostname,
            with_certificate = domain.has_certificate(),
            "custom domain created"
        );

        Ok(domain)
    }

    /// A project's domains in creation order
    pub async fn list(&self, project: &Project) -> Result<Vec<PagesDomain>> {
        self.domains.list_for_project(project.id).await
    }

    /// Look up a domain by hostname, across all projects
    pub async fn find_by_hostname(&self, hostname: &str) -> Result<Option<PagesDomain>> {
        self.domains.find_by_hostname(hostname).await
    }

    /// Remove a domain record; `NotFound` when absent
    pub async fn remove(&self, domain_id: Uuid) -> Result<()> {
        self.domains.delete(domain_id).await?;
        tracing::info!(domain_id = %domain_id, "custom domain removed");
        Ok(())
    }

    /// Cascade removal when the owning project is destroyed
    pub async fn remove_all_for_project(&self, project_id: Uuid) -> Result<u64> {
        let removed = self.domains.delete_for_project(project_id).await?;
        if removed > 0 {
            tracing::info!(
                project_id = %project_id,
                removed,
                "custom domains removed with project"
            );
        }
        Ok(removed)
    }
}
