//! Postgres-backed store implementations
//!
//! Schema lives in `migrations/` at the workspace root. Hostname
//! uniqueness is enforced by a unique index and surfaces as
//! `DuplicateHostname`, so a losing insert persists nothing.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use pagedock_common::{Error, Result};

use crate::domain::entities::{Deployment, PagesDomain, Project};

use super::{DeploymentStore, DomainStore, ProjectStore};

#[derive(Clone)]
pub struct PgProjectStore {
    pool: PgPool,
}

impl PgProjectStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn insert(&self, project: &Project) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pages_projects (
                id, name, namespace_id, namespace_kind, namespace_owner_id,
                active_deployment_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(project.namespace_id)
        .bind(project.namespace_kind)
        .bind(project.namespace_owner_id)
        .bind(project.active_deployment_id)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, project_id: Uuid) -> Result<Option<Project>> {
        let row = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, namespace_id, namespace_kind, namespace_owner_id,
                   active_deployment_id, created_at, updated_at
            FROM pages_projects
            WHERE id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn set_active_deployment(
        &self,
        project_id: Uuid,
        deployment_id: Option<Uuid>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE pages_projects
            SET active_deployment_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(project_id)
        .bind(deployment_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("project {project_id}")));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgDeploymentStore {
    pool: PgPool,
}

impl PgDeploymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeploymentStore for PgDeploymentStore {
    async fn insert(&self, deployment: &Deployment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pages_deployments (
                id, project_id, commit_sha, archive_path, metadata_path,
                status, failure_reason, size_bytes, entry_count, digest,
                created_at, finished_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(deployment.id)
        .bind(deployment.project_id)
        .bind(&deployment.commit_sha)
        .bind(&deployment.archive_path)
        .bind(&deployment.metadata_path)
        .bind(deployment.status)
        .bind(&deployment.failure_reason)
        .bind(deployment.size_bytes)
        .bind(deployment.entry_count)
        .bind(&deployment.digest)
        .bind(deployment.created_at)
        .bind(deployment.finished_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, deployment_id: Uuid) -> Result<Option<Deployment>> {
        let row = sqlx::query_as::<_, Deployment>(
            r#"
            SELECT id, project_id, commit_sha, archive_path, metadata_path,
                   status, failure_reason, size_bytes, entry_count, digest,
                   created_at, finished_at
            FROM pages_deployments
            WHERE id = $1
            "#,
        )
        .bind(deployment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete(&self, deployment_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM pages_deployments WHERE id = $1")
            .bind(deployment_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("deployment {deployment_id}")));
        }
        Ok(())
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<Deployment>> {
        let rows = sqlx::query_as::<_, Deployment>(
            r#"
            SELECT id, project_id, commit_sha, archive_path, metadata_path,
                   status, failure_reason, size_bytes, entry_count, digest,
                   created_at, finished_at
            FROM pages_deployments
            WHERE project_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[derive(Clone)]
pub struct PgDomainStore {
    pool: PgPool,
}

impl PgDomainStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DomainStore for PgDomainStore {
    async fn insert(&self, domain: &PagesDomain) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO pages_domains (
                id, project_id, hostname, certificate_pem, certificate_key_pem,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(domain.id)
        .bind(domain.project_id)
        .bind(&domain.hostname)
        .bind(&domain.certificate_pem)
        .bind(&domain.certificate_key_pem)
        .bind(domain.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(Error::DuplicateHostname(domain.hostname.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, domain_id: Uuid) -> Result<Option<PagesDomain>> {
        let row = sqlx::query_as::<_, PagesDomain>(
            r#"
            SELECT id, project_id, hostname, certificate_pem, certificate_key_pem,
                   created_at
            FROM pages_domains
            WHERE id = $1
            "#,
        )
        .bind(domain_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_hostname(&self, hostname: &str) -> Result<Option<PagesDomain>> {
        let row = sqlx::query_as::<_, PagesDomain>(
            r#"
            SELECT id, project_id, hostname, certificate_pem, certificate_key_pem,
                   created_at
            FROM pages_domains
            WHERE hostname = $1
            "#,
        )
        .bind(hostname)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<PagesDomain>> {
        let rows = sqlx::query_as::<_, PagesDomain>(
            r#"
            SELECT id, project_id, hostname, certificate_pem, certificate_key_pem,
                   created_at
            FROM pages_domains
            WHERE project_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn delete(&self, domain_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM pages_domains WHERE id = $1")
            .bind(domain_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("domain {domain_id}")));
        }
        Ok(())
    }

    async fn delete_for_project(&self, project_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM pages_domains WHERE project_id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
