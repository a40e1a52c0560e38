//! Deployment service: the publish/remove orchestrator
//!
//! Receives a build reference, runs the validation gate and the atomic
//! publisher, records the outcome, and exposes owner-only removal.
//! Validation and extraction run outside any lock (staging directories are
//! per-attempt); the content-pointer swap and every mutation of the active
//! deployment pointer happen inside a per-project exclusive section shared
//! with removal.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use pagedock_common::{Error, Result};

use crate::archive::ArchiveReader;
use crate::domain::entities::{Actor, Deployment, Project};
use crate::domain::state::{
    DeploymentEvent, DeploymentGuardContext, DeploymentState, DeploymentStateMachine, StateError,
};
use crate::publish::Publisher;
use crate::repository::{DeploymentStore, ProjectStore};
use crate::validate::{validate, SiteLimits};

/// Decides whether an actor may remove a project's published content
///
/// Injected into the service as a pure predicate; the engine performs no
/// authentication of its own.
pub trait OwnershipPolicy: Send + Sync {
    fn is_effective_owner(&self, actor: &Actor, project: &Project) -> bool;
}

/// Default policy: the namespace owner is the effective owner
///
/// For user namespaces that is the user itself; for group namespaces the
/// group's owner.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamespaceOwnership;

impl OwnershipPolicy for NamespaceOwnership {
    fn is_effective_owner(&self, actor: &Actor, project: &Project) -> bool {
        actor.id == project.effective_owner_id()
    }
}

/// Reference to one CI build artifact pair
#[derive(Debug, Clone)]
pub struct BuildRef {
    pub commit_sha: String,
    pub archive_path: PathBuf,
    pub metadata_path: PathBuf,
}

/// Per-project exclusive sections
#[derive(Default)]
struct ProjectLocks {
    inner: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl ProjectLocks {
    fn lock_for(&self, project_id: Uuid) -> Arc<AsyncMutex<()>> {
        self.inner
            .lock()
            .unwrap()
            .entry(project_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// Orchestrates publishing and removal of a project's pages
pub struct DeploymentService {
    projects: Arc<dyn ProjectStore>,
    deployments: Arc<dyn DeploymentStore>,
    publisher: Publisher,
    limits: SiteLimits,
    ownership: Arc<dyn OwnershipPolicy>,
    locks: ProjectLocks,
}

impl DeploymentService {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        deployments: Arc<dyn DeploymentStore>,
        publisher: Publisher,
        limits: SiteLimits,
        ownership: Arc<dyn OwnershipPolicy>,
    ) -> Self {
        DeploymentService {
            projects,
            deployments,
            publisher,
            limits,
            ownership,
            locks: ProjectLocks::default(),
        }
    }

    /// Publish a build artifact as the project's served site content
    ///
    /// Runs the validation gate to completion before any filesystem
    /// mutation, extracts into a per-attempt staging directory, and swaps
    /// the content pointer inside the per-project exclusive section. Every
    /// failure records a Failed deployment and leaves previously-served
    /// content, and the project's deployed state, untouched.
    pub async fn publish(&self, project_id: Uuid, build: BuildRef) -> Result<Deployment> {
        let project = self.load_project(project_id).await?;

        DeploymentStateMachine::transition(
            project.deployment_state(),
            DeploymentEvent::RequestPublish,
            None,
        )
        .map_err(map_state_error)?;

        tracing::info!(
            project_id = %project_id,
            commit_sha = %build.commit_sha,
            "publish requested"
        );

        // Validation gate: pure, no filesystem mutation on rejection.
        let limits = self.limits;
        let archive_path = build.archive_path.clone();
        let metadata_path = build.metadata_path.clone();
        let opened = tokio::task::spawn_blocking(move || -> Result<ArchiveReader> {
            let reader = ArchiveReader::open(&archive_path, &metadata_path)?;
            validate(&reader, &limits)?;
            Ok(reader)
        })
        .await
        .map_err(|e| Error::Internal(format!("validation task panicked: {e}")))?;

        let reader = match opened {
            Ok(reader) => reader,
            Err(err) => return self.record_failure(&project, &build, err).await,
        };

        // Extraction runs lock-free in a staging directory scoped to this
        // attempt; concurrent attempts never share one.
        let staged = match self.publisher.extract(reader, self.limits.max_total_size).await {
            Ok(staged) => staged,
            Err(err) => return self.record_failure(&project, &build, err).await,
        };

        // Exclusive section: pointer swap + record + active pointer.
        let lock = self.locks.lock_for(project_id);
        let _guard = lock.lock().await;

        let current = self.load_project(project_id).await?;
        let deployment = Deployment::success(
            project_id,
            build.commit_sha.clone(),
            build.archive_path.display().to_string(),
            build.metadata_path.display().to_string(),
            staged.size_bytes as i64,
            staged.entry_count as i32,
            staged.digest.clone(),
        );

        let previous_tree = match self.publisher.commit(project_id, deployment.id, staged).await {
            Ok(previous) => previous,
            Err(err) => return self.record_failure(&current, &build, err).await,
        };

        self.deployments.insert(&deployment).await?;
        self.projects
            .set_active_deployment(project_id, Some(deployment.id))
            .await?;

        // The losing/superseded tree is retired only after the swap and
        // records are in place.
        if let Some(previous) = previous_tree {
            self.publisher.retire(previous).await;
        }

        tracing::info!(
            project_id = %project_id,
            deployment_id = %deployment.id,
            size_bytes = deployment.size_bytes,
            superseded = ?current.active_deployment_id,
            "pages deployed"
        );

        Ok(deployment)
    }

    /// Remove the project's published content and its active deployment
    ///
    /// Permitted only for the project's effective owner. Domain records
    /// and their certificates survive removal.
    pub async fn remove(&self, actor: &Actor, project_id: Uuid) -> Result<()> {
        let project = self.load_project(project_id).await?;

        if !self.ownership.is_effective_owner(actor, &project) {
            return Err(Error::Forbidden);
        }

        // Same serialization point as publish, so removal and a concurrent
        // publish cannot interleave into "deployed flag set, content gone".
        let lock = self.locks.lock_for(project_id);
        let _guard = lock.lock().await;

        let project = self.load_project(project_id).await?;
        let active = project
            .active_deployment_id
            .ok_or_else(|| Error::NotFound(format!("no active deployment for {project_id}")))?;

        DeploymentStateMachine::transition(
            DeploymentState::Deployed,
            DeploymentEvent::Remove,
            None,
        )
        .map_err(map_state_error)?;

        self.projects.set_active_deployment(project_id, None).await?;
        self.deployments.delete(active).await?;
        self.publisher.remove_site(project_id).await?;

        tracing::info!(
            project_id = %project_id,
            deployment_id = %active,
            "pages removed"
        );

        Ok(())
    }

    /// Resting deployment state of a project
    pub async fn state(&self, project_id: Uuid) -> Result<DeploymentState> {
        Ok(self.load_project(project_id).await?.deployment_state())
    }

    /// Currently-served content directory, if anything is deployed
    pub fn served_root(&self, project_id: Uuid) -> Option<PathBuf> {
        self.publisher.served_root(project_id)
    }

    async fn load_project(&self, project_id: Uuid) -> Result<Project> {
        self.projects
            .get(project_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("project {project_id}")))
    }

    async fn record_failure(
        &self,
        project: &Project,
        build: &BuildRef,
        err: Error,
    ) -> Result<Deployment> {
        let context = DeploymentGuardContext {
            has_prior_deployment: project.pages_deployed(),
        };
        let fallback = DeploymentStateMachine::transition(
            DeploymentState::Deploying,
            DeploymentEvent::PublishFailed,
            Some(&context),
        )
        .map_err(map_state_error)?;

        let deployment = Deployment::failure(
            project.id,
            build.commit_sha.clone(),
            build.archive_path.display().to_string(),
            build.metadata_path.display().to_string(),
            err.to_string(),
        );
        self.deployments.insert(&deployment).await?;

        tracing::warn!(
            project_id = %project.id,
            commit_sha = %build.commit_sha,
            error_code = err.error_code(),
            state = %fallback,
            "publish failed"
        );

        Err(err)
    }
}

fn map_state_error(err: StateError) -> Error {
    match err {
        StateError::InvalidTransition { from, event, .. } => Error::Validation(format!(
            "Invalid deployment transition: cannot apply '{event}' event from '{from}' state"
        )),
        StateError::GuardFailed(msg) => Error::Validation(msg),
    }
}
