//! Atomic publishing of validated archive content
//!
//! Extraction happens in a per-attempt staging directory that is never
//! reused; the served tree is only ever replaced by a single atomic
//! pointer swap, so a concurrent reader never observes a mix of old and
//! new files. A failed attempt discards its staging directory and leaves
//! previously-served content untouched.
//!
//! Directory layout under the pages root:
//!
//! ```text
//! <root>/staging/<uuid>                      scratch for one publish attempt
//! <root>/store/<project_id>/<deployment_id>  immutable extracted trees
//! <root>/sites/<project_id>                  symlink -> the served store dir
//! ```

use std::fs;
use std::io::{self, Read};
use std::os::unix::fs::symlink;
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use pagedock_common::{Error, Result};

use crate::archive::ArchiveReader;

/// Content extracted into a staging directory, ready to be committed
#[derive(Debug)]
pub struct StagedSite {
    pub dir: PathBuf,
    pub size_bytes: u64,
    pub entry_count: u32,
    /// Hex SHA-256 of the consumed archive file
    pub digest: String,
}

/// Publishes extracted site content under a pages root directory
#[derive(Debug, Clone)]
pub struct Publisher {
    pages_root: PathBuf,
}

impl Publisher {
    pub fn new(pages_root: impl Into<PathBuf>) -> Self {
        Publisher {
            pages_root: pages_root.into(),
        }
    }

    fn staging_root(&self) -> PathBuf {
        self.pages_root.join("staging")
    }

    fn store_root(&self) -> PathBuf {
        self.pages_root.join("store")
    }

    fn sites_root(&self) -> PathBuf {
        self.pages_root.join("sites")
    }

    /// The served-content pointer for a project
    pub fn site_pointer(&self, project_id: Uuid) -> PathBuf {
        self.sites_root().join(project_id.to_string())
    }

    /// Extract every entry of a validated archive into a fresh staging
    /// directory
    ///
    /// The cumulative written size is bounded by `max_bytes` as a guard
    /// against metadata that lied its way through validation. Any failure
    /// removes the staging directory before returning.
    pub async fn extract(&self, reader: ArchiveReader, max_bytes: u64) -> Result<StagedSite> {
        let staging = self.staging_root().join(Uuid::new_v4().to_string());

        let staging_task = staging.clone();
        let result = tokio::task::spawn_blocking(move || {
            extract_into(&reader, &staging_task, max_bytes)
        })
        .await
        .map_err(|e| Error::Internal(format!("extraction task panicked: {e}")))?;

        match result {
            Ok(staged) => Ok(staged),
            Err(err) => {
                let _ = fs::remove_dir_all(&staging);
                Err(err)
            }
        }
    }

    /// Commit a staged site as the served content for a project
    ///
    /// Moves the staged tree into the store, then swaps the site pointer
    /// with a create-then-rename, the single atomic replace. Returns the
    /// previously-served store directory, if any, so the caller can retire
    /// it once records are updated.
    pub async fn commit(
        &self,
        project_id: Uuid,
        deployment_id: Uuid,
        staged: StagedSite,
    ) -> Result<Option<PathBuf>> {
        let store_dir = self
            .store_root()
            .join(project_id.to_string())
            .join(deployment_id.to_string());
        let sites_root = self.sites_root();
        let pointer = self.site_pointer(project_id);

        tokio::task::spawn_blocking(move || {
            if let Some(parent) = store_dir.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(&staged.dir, &store_dir)?;

            fs::create_dir_all(&sites_root)?;
            let previous = fs::read_link(&pointer).ok();

            // Swap the pointer: a rename over the old symlink is atomic,
            // readers resolve either the old tree or the new one in full.
            let tmp = sites_root.join(format!(".{project_id}.{deployment_id}.tmp"));
            let _ = fs::remove_file(&tmp);
            symlink(&store_dir, &tmp)?;
            fs::rename(&tmp, &pointer)?;

            tracing::info!(
                project_id = %project_id,
                deployment_id = %deployment_id,
                "site content pointer swapped"
            );

            Ok(previous)
        })
        .await
        .map_err(|e| Error::Internal(format!("commit task panicked: {e}")))?
    }

    /// Discard a staged site that will not be committed
    pub async fn discard(&self, staged: StagedSite) {
        let _ = tokio::fs::remove_dir_all(&staged.dir).await;
    }

    /// Retire a store directory that is no longer pointed at
    pub async fn retire(&self, store_dir: PathBuf) {
        if let Err(e) = tokio::fs::remove_dir_all(&store_dir).await {
            tracing::warn!(dir = %store_dir.display(), error = %e, "failed to retire store dir");
        }
    }

    /// Remove a project's served content entirely: pointer and store
    pub async fn remove_site(&self, project_id: Uuid) -> Result<()> {
        let pointer = self.site_pointer(project_id);
        let store = self.store_root().join(project_id.to_string());

        tokio::task::spawn_blocking(move || -> Result<()> {
            match fs::remove_file(&pointer) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            match fs::remove_dir_all(&store) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            Ok(())
        })
        .await
        .map_err(|e| Error::Internal(format!("removal task panicked: {e}")))?
    }

    /// Resolve the currently-served content directory, if any
    pub fn served_root(&self, project_id: Uuid) -> Option<PathBuf> {
        let target = fs::read_link(self.site_pointer(project_id)).ok()?;
        target.is_dir().then_some(target)
    }
}

/// Reject entry paths that would escape the staging directory
pub(crate) fn sanitize_entry_path(path: &str) -> Result<PathBuf> {
    let raw = Path::new(path);
    if raw.is_absolute() {
        return Err(Error::Io(io::Error::other(format!(
            "refusing absolute entry path: {path}"
        ))));
    }

    let mut clean = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                return Err(Error::Io(io::Error::other(format!(
                    "refusing unsafe entry path: {path}"
                ))));
            }
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(Error::Io(io::Error::other(format!(
            "refusing empty entry path: {path}"
        ))));
    }

    Ok(clean)
}

fn extract_into(reader: &ArchiveReader, staging: &Path, max_bytes: u64) -> Result<StagedSite> {
    fs::create_dir_all(staging)?;

    let mut total: u64 = 0;
    let mut count: u32 = 0;

    reader.visit_entries(|entry, body| {
        let rel = sanitize_entry_path(&entry.path)?;
        let dest = staging.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let budget = max_bytes.saturating_sub(total) + 1;
        let mut out = fs::File::create(&dest)?;
        let mut limited = (&mut *body).take(budget);
        let written = io::copy(&mut limited, &mut out)?;

        total += written;
        if total > max_bytes {
            return Err(Error::Io(io::Error::other(
                "extracted content exceeds the validated size limit",
            )));
        }
        if written != entry.size {
            return Err(Error::CorruptArchive(format!(
                "entry {} is truncated in the archive",
                entry.path
            )));
        }

        count += 1;
        Ok(())
    })?;

    let digest = archive_digest(reader.archive_path())?;

    tracing::debug!(
        staging = %staging.display(),
        size_bytes = total,
        entry_count = count,
        "archive extracted into staging"
    );

    Ok(StagedSite {
        dir: staging.to_path_buf(),
        size_bytes: total,
        entry_count: count,
        digest,
    })
}

fn archive_digest(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
