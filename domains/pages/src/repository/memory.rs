//! In-memory store implementation
//!
//! Backs tests and embedders without a database. Shares state across
//! clones so one store can be handed to several components.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use pagedock_common::{Error, Result};

use crate::domain::entities::{Deployment, PagesDomain, Project};

use super::{DeploymentStore, DomainStore, ProjectStore};

/// In-memory implementation of all three store traits
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    projects: Arc<Mutex<HashMap<Uuid, Project>>>,
    deployments: Arc<Mutex<HashMap<Uuid, Deployment>>>,
    /// Insertion order is preserved; `list_for_project` filters it
    domains: Arc<Mutex<Vec<PagesDomain>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of domain records across all projects
    pub fn domain_count(&self) -> usize {
        self.domains.lock().unwrap().len()
    }

    /// Total number of deployment records across all projects
    pub fn deployment_count(&self) -> usize {
        self.deployments.lock().unwrap().len()
    }
}

#[async_trait]
impl ProjectStore for InMemoryStore {
    async fn insert(&self, project: &Project) -> Result<()> {
        let mut projects = self.projects.lock().unwrap();
        if projects.contains_key(&project.id) {
            return Err(Error::Internal(format!(
                "project {} already exists",
                project.id
            )));
        }
        projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn get(&self, project_id: Uuid) -> Result<Option<Project>> {
        Ok(self.projects.lock().unwrap().get(&project_id).cloned())
    }

    async fn set_active_deployment(
        &self,
        project_id: Uuid,
        deployment_id: Option<Uuid>,
    ) -> Result<()> {
        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .get_mut(&project_id)
            .ok_or_else(|| Error::NotFound(format!("project {project_id}")))?;
        project.active_deployment_id = deployment_id;
        project.updated_at = chrono::Utc::now();
        Ok(())
    }
}

#[async_trait]
impl DeploymentStore for InMemoryStore {
    async fn insert(&self, deployment: &Deployment) -> Result<()> {
        let mut deployments = self.deployments.lock().unwrap();
        if deployments.contains_key(&deployment.id) {
            return Err(Error::Internal(format!(
                "deployment {} already exists",
                deployment.id
            )));
        }
        deployments.insert(deployment.id, deployment.clone());
        Ok(())
    }

    async fn get(&self, deployment_id: Uuid) -> Result<Option<Deployment>> {
        Ok(self
            .deployments
            .lock()
            .unwrap()
            .get(&deployment_id)
            .cloned())
    }

    async fn delete(&self, deployment_id: Uuid) -> Result<()> {
        self.deployments
            .lock()
            .unwrap()
            .remove(&deployment_id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("deployment {deployment_id}")))
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Deployment>> {
        let mut records: Vec<Deployment> = self
            .deployments
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect();
        records.sort_by_key(|d| d.created_at);
        Ok(records)
    }
}

#[async_trait]
impl DomainStore for InMemoryStore {
    async fn insert(&self, domain: &PagesDomain) -> Result<()> {
        let mut domains = self.domains.lock().unwrap();
        // Uniqueness is global across projects, not per project
        if domains.iter().any(|d| d.hostname == domain.hostname) {
            return Err(Error::DuplicateHostname(domain.hostname.clone()));
        }
        domains.push(domain.clone());
        Ok(())
    }

    async fn get(&self, domain_id: Uuid) -> Result<Option<PagesDomain>> {
        Ok(self
            .domains
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == domain_id)
            .cloned())
    }

    async fn find_by_hostname(&self, hostname: &str) -> Result<Option<PagesDomain>> {
        Ok(self
            .domains
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.hostname == hostname)
            .cloned())
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<PagesDomain>> {
        Ok(self
            .domains
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, domain_id: Uuid) -> Result<()> {
        let mut domains = self.domains.lock().unwrap();
        let before = domains.len();
        domains.retain(|d| d.id != domain_id);
        if domains.len() == before {
            return Err(Error::NotFound(format!("domain {domain_id}")));
        }
        Ok(())
    }

    async fn delete_for_project(&self, project_id: Uuid) -> Result<u64> {
        let mut domains = self.domains.lock().unwrap();
        let before = domains.len();
        domains.retain(|d| d.project_id != project_id);
        Ok((before - domains.len()) as u64)
    }
}
