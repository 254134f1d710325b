//! Staging directories
//!
//! Each pattern stages its source under `<work_root>/<name>`. The directory
//! belongs to that pattern's pipeline alone and is removed when the pipeline
//! ends, whichever way it ends.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Computes the staging path of a pattern
pub fn staging_path(work_root: &Path, name: &str) -> PathBuf {
    work_root.join(name)
}

/// Staging directory owned by one pattern's pipeline
///
/// Removal is best-effort and idempotent: removing a directory that is
/// already gone is a no-op. Dropping the guard removes the directory too.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    owned: bool,
}

impl StagingDir {
    pub fn new(work_root: &Path, name: &str) -> Self {
        Self {
            path: staging_path(work_root, name),
            owned: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gives up ownership so the directory is never removed
    ///
    /// Used when the path already existed before this pipeline started.
    pub fn release(&mut self) {
        self.owned = false;
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Removes the directory
    ///
    /// # Returns
    /// `true` if something was removed, `false` if there was nothing to remove
    pub fn cleanup(&mut self) -> io::Result<bool> {
        if !self.owned {
            debug!(
                "Staging directory {} is not owned, leaving it in place",
                self.path.display()
            );
            return Ok(false);
        }

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {
                debug!("Removed staging directory {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!(
                "Failed to remove staging directory {} on drop: {}",
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let mut staging = StagingDir::new(root.path(), "demo-fn");
        std::fs::create_dir_all(staging.path().join("src")).unwrap();
        std::fs::write(staging.path().join("src/index.js"), "exports.handler = 1").unwrap();

        assert!(staging.cleanup().unwrap());
        assert!(!staging.path().exists());

        // second call is a no-op
        assert!(!staging.cleanup().unwrap());
    }

    #[test]
    fn test_cleanup_of_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let mut staging = StagingDir::new(root.path(), "never-created");
        assert!(!staging.cleanup().unwrap());
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let staging = StagingDir::new(root.path(), "demo-svc");
            std::fs::create_dir_all(staging.path()).unwrap();
            staging.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_released_directory_is_kept() {
        let root = tempfile::tempdir().unwrap();
        let path = staging_path(root.path(), "foreign");
        std::fs::create_dir_all(&path).unwrap();

        {
            let mut staging = StagingDir::new(root.path(), "foreign");
            staging.release();
            assert!(!staging.is_owned());
            assert!(!staging.cleanup().unwrap());
        }
        assert!(path.exists());
    }
}
