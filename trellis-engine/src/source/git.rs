//! Git adapter built on gix
//!
//! A clone is a bare repository under `<destination>/.git`. Checking out a
//! reference replaces the working files next to it with the referenced tree.

use anyhow::{Context, Result, bail};
use gix::object::tree::EntryKind;
use gix::progress::Discard;
use std::path::Path;
use tracing::{debug, warn};

use super::SourceControl;

const GIT_DIR: &str = ".git";

/// [`SourceControl`] backed by gix
#[derive(Debug, Clone, Copy, Default)]
pub struct GitSource;

impl GitSource {
    pub fn new() -> Self {
        Self
    }
}

impl SourceControl for GitSource {
    fn clone_repository(&self, url: &str, destination: &Path) -> Result<()> {
        debug!("Fetching {} into {}", url, destination.join(GIT_DIR).display());
        std::fs::create_dir_all(destination)
            .with_context(|| format!("Failed to create {}", destination.display()))?;

        // full history, a pinned revision may be anywhere on the branch
        let (_repo, _outcome) = gix::prepare_clone_bare(url, destination.join(GIT_DIR))
            .with_context(|| format!("Failed to prepare clone of {}", url))?
            .fetch_only(Discard, &gix::interrupt::IS_INTERRUPTED)
            .with_context(|| format!("Failed to fetch {}", url))?;

        Ok(())
    }

    fn checkout(&self, workdir: &Path, reference: &str) -> Result<()> {
        let repo = gix::open(workdir.join(GIT_DIR))
            .with_context(|| format!("Failed to open repository in {}", workdir.display()))?;

        let id = resolve(&repo, reference)?;
        let commit = repo
            .find_commit(id)
            .with_context(|| format!("{} does not name a commit", reference))?;
        let tree = commit
            .tree()
            .with_context(|| format!("Failed to read tree of {}", id))?;

        clear_worktree(workdir)?;
        extract_tree(&repo, &tree, workdir)?;

        debug!("Checked out {} ({}) in {}", reference, id, workdir.display());
        Ok(())
    }
}

/// Resolves a branch, tag or revision to a commit id
///
/// Branches of a fresh clone may only exist as `origin/<branch>`.
fn resolve(repo: &gix::Repository, reference: &str) -> Result<gix::ObjectId> {
    for candidate in [reference.to_string(), format!("origin/{}", reference)] {
        if let Ok(id) = repo.rev_parse_single(candidate.as_str()) {
            let commit = id
                .object()
                .with_context(|| format!("Failed to read object {}", id))?
                .peel_to_commit()
                .with_context(|| format!("{} does not point at a commit", candidate))?;
            return Ok(commit.id);
        }
    }
    bail!("could not resolve reference {}", reference)
}

/// Removes every working file, keeping the repository itself
fn clear_worktree(workdir: &Path) -> Result<()> {
    for entry in std::fs::read_dir(workdir)
        .with_context(|| format!("Failed to read {}", workdir.display()))?
    {
        let entry = entry?;
        if entry.file_name() == GIT_DIR {
            continue;
        }
        let path = entry.path();
        let removed = if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        removed.with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

fn extract_tree(repo: &gix::Repository, tree: &gix::Tree<'_>, dest: &Path) -> Result<()> {
    for entry in tree.iter() {
        let entry = entry.context("Failed to read tree entry")?;
        let name = std::str::from_utf8(entry.filename())
            .with_context(|| format!("Non UTF-8 file name under {}", dest.display()))?;

        if name.contains("..") || name.starts_with('/') || name.contains('\0') {
            bail!("refusing to write {} outside {}", name, dest.display());
        }

        let entry_path = dest.join(name);
        match entry.mode().kind() {
            EntryKind::Tree => {
                std::fs::create_dir_all(&entry_path)?;
                let subtree = repo
                    .find_tree(entry.oid())
                    .with_context(|| format!("Failed to find tree {}", entry_path.display()))?;
                extract_tree(repo, &subtree, &entry_path)?;
            }
            EntryKind::Blob | EntryKind::BlobExecutable => {
                let object = repo
                    .find_object(entry.oid())
                    .with_context(|| format!("Failed to find blob {}", entry_path.display()))?;
                std::fs::write(&entry_path, object.data.as_slice())
                    .with_context(|| format!("Failed to write {}", entry_path.display()))?;

                #[cfg(unix)]
                if matches!(entry.mode().kind(), EntryKind::BlobExecutable) {
                    use std::os::unix::fs::PermissionsExt;
                    std::fs::set_permissions(&entry_path, std::fs::Permissions::from_mode(0o755))?;
                }
            }
            EntryKind::Link => {
                warn!("Skipping symlink {}", entry_path.display());
            }
            EntryKind::Commit => {
                warn!("Skipping submodule {}", entry_path.display());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    // fixtures are built with the git executable, which gix also needs to
    // serve local clones
    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn git(dir: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args([
                "-c",
                "user.name=trellis",
                "-c",
                "user.email=trellis@example.com",
                "-c",
                "commit.gpgsign=false",
            ])
            .args(args)
            .output()
            .unwrap();
        assert!(output.status.success(), "git {:?} failed", args);
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    #[test]
    fn test_clone_of_missing_repository_fails() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does-not-exist");
        let err = GitSource::new()
            .clone_repository(&missing.to_string_lossy(), &root.path().join("copy"))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("does-not-exist"));
    }

    #[test]
    fn test_checkout_without_clone_fails() {
        let root = tempfile::tempdir().unwrap();
        let err = GitSource::new().checkout(root.path(), "main").unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open repository"));
    }

    #[test]
    fn test_clone_and_checkout_local_repository() {
        if !git_available() {
            return;
        }

        let root = tempfile::tempdir().unwrap();
        let origin = root.path().join("origin");
        std::fs::create_dir_all(origin.join("bin")).unwrap();
        git(&origin, &["init", "--quiet"]);
        git(&origin, &["checkout", "--quiet", "-b", "release"]);
        std::fs::write(origin.join("VERSION"), "1").unwrap();
        std::fs::write(origin.join("OLD"), "gone later").unwrap();
        git(&origin, &["add", "VERSION", "OLD"]);
        git(&origin, &["commit", "--quiet", "-m", "first"]);
        let first = git(&origin, &["rev-parse", "HEAD"]);
        std::fs::write(origin.join("VERSION"), "2").unwrap();
        std::fs::write(origin.join("bin/run.sh"), "#!/bin/sh\n").unwrap();
        git(&origin, &["rm", "--quiet", "OLD"]);
        git(&origin, &["add", "bin/run.sh"]);
        git(&origin, &["update-index", "--chmod=+x", "bin/run.sh"]);
        git(&origin, &["commit", "--quiet", "-m", "second"]);

        let copy = root.path().join("copy");
        let source = GitSource::new();
        source
            .clone_repository(&origin.to_string_lossy(), &copy)
            .unwrap();
        assert!(copy.join(".git").is_dir());

        source.checkout(&copy, "release").unwrap();
        assert_eq!(std::fs::read_to_string(copy.join("VERSION")).unwrap(), "2");
        assert!(!copy.join("OLD").exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(copy.join("bin/run.sh"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o111, 0o111);
        }

        source.checkout(&copy, &first).unwrap();
        assert_eq!(std::fs::read_to_string(copy.join("VERSION")).unwrap(), "1");
        assert!(copy.join("OLD").exists());
        assert!(!copy.join("bin").exists());

        source.checkout(&copy, &first[..10]).unwrap();
        assert!(source.checkout(&copy, "no-such-branch").is_err());
        assert!(copy.join(".git").is_dir());
    }
}
