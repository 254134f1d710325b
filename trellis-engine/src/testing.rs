//! Test collaborators

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use crate::source::SourceControl;

/// In-process [`SourceControl`] that writes a tiny working copy
#[derive(Debug, Default)]
pub struct FakeSourceControl {
    calls: Mutex<Vec<String>>,
    failing_clones: HashSet<String>,
    failing_checkouts: HashSet<String>,
}

impl FakeSourceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_clone(mut self, url: &str) -> Self {
        self.failing_clones.insert(url.to_string());
        self
    }

    pub fn failing_checkout(mut self, reference: &str) -> Self {
        self.failing_checkouts.insert(reference.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clone_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with("clone "))
            .count()
    }
}

impl SourceControl for FakeSourceControl {
    fn clone_repository(&self, url: &str, destination: &Path) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(format!("clone {}", url));
        if self.failing_clones.contains(url) {
            anyhow::bail!("repository '{}' not found", url);
        }
        std::fs::create_dir_all(destination)?;
        std::fs::write(destination.join("README.md"), url)?;
        Ok(())
    }

    fn checkout(&self, workdir: &Path, reference: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(format!("checkout {}", reference));
        if self.failing_checkouts.contains(reference) {
            anyhow::bail!("pathspec '{}' did not match any file(s) known to git", reference);
        }
        std::fs::write(workdir.join("HEAD_REF"), reference)?;
        Ok(())
    }
}
