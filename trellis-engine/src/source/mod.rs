//! Source staging
//!
//! Acquires a working copy of a repository at a branch, optionally pinned to
//! a revision, into a destination directory that must not exist yet.
//!
//! Git is consumed through the narrow [`SourceControl`] contract; failures
//! propagate immediately and are never retried.

mod git;

pub use git::GitSource;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use trellis_core::DeployError;

/// Source-control operations needed to stage a pattern
pub trait SourceControl: Send + Sync {
    /// Clones `url` into `destination`, creating it
    fn clone_repository(&self, url: &str, destination: &Path) -> anyhow::Result<()>;

    /// Checks out `reference` (branch or revision) inside `workdir`
    fn checkout(&self, workdir: &Path, reference: &str) -> anyhow::Result<()>;
}

/// A populated working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSource {
    pub path: PathBuf,
    pub branch: String,
    pub revision: Option<String>,
}

/// Stages sources through a [`SourceControl`] implementation
pub struct SourceFetcher {
    scm: Arc<dyn SourceControl>,
}

impl SourceFetcher {
    pub fn new(scm: Arc<dyn SourceControl>) -> Self {
        Self { scm }
    }

    /// Clones `repository` into `destination`, checks out `branch`, then
    /// `revision` when given
    ///
    /// On failure the destination may hold a partial checkout; removing it
    /// is the caller's job.
    pub async fn fetch(
        &self,
        repository: &str,
        branch: &str,
        destination: &Path,
        revision: Option<&str>,
    ) -> Result<StagedSource, DeployError> {
        let scm = Arc::clone(&self.scm);
        let repository = repository.to_string();
        let branch = branch.to_string();
        let destination = destination.to_path_buf();
        let revision = revision.map(str::to_string);

        // git calls block on network and disk
        tokio::task::spawn_blocking(move || {
            fetch_sync(
                scm.as_ref(),
                &repository,
                &branch,
                &destination,
                revision.as_deref(),
            )
        })
        .await
        .map_err(|e| DeployError::Internal(format!("source fetch task failed: {}", e)))?
    }
}

fn fetch_sync(
    scm: &dyn SourceControl,
    repository: &str,
    branch: &str,
    destination: &Path,
    revision: Option<&str>,
) -> Result<StagedSource, DeployError> {
    // symlink_metadata also catches dangling symlinks
    if destination.symlink_metadata().is_ok() {
        return Err(DeployError::DestinationConflict {
            path: destination.to_path_buf(),
        });
    }

    info!("Cloning {} into {}", repository, destination.display());
    scm.clone_repository(repository, destination)
        .map_err(|e| DeployError::clone_failed(repository, format!("{:#}", e)))?;

    debug!("Checking out branch {}", branch);
    scm.checkout(destination, branch)
        .map_err(|e| DeployError::checkout_failed(branch, format!("{:#}", e)))?;

    if let Some(revision) = revision {
        debug!("Checking out revision {}", revision);
        scm.checkout(destination, revision)
            .map_err(|e| DeployError::checkout_failed(revision, format!("{:#}", e)))?;
    }

    info!(
        "Staged {}@{} at {}",
        repository,
        revision.unwrap_or(branch),
        destination.display()
    );

    Ok(StagedSource {
        path: destination.to_path_buf(),
        branch: branch.to_string(),
        revision: revision.map(str::to_string),
    })
}
