//! Podman image publishing
//!
//! Builds a container image from a local directory and pushes it to a
//! registry reference:
//! - Checking podman availability
//! - `podman build` with the final remote reference as tag
//! - `podman push` to the registry

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;
use tracing::{debug, error, info};

/// Checks if podman is installed and available
pub fn check_podman_available(binary: &str) -> Result<()> {
    let output = Command::new(binary)
        .arg("--version")
        .output()
        .with_context(|| format!("Failed to execute '{} --version'. Is podman installed?", binary))?;

    if !output.status.success() {
        anyhow::bail!("Podman is not working correctly");
    }

    let version = String::from_utf8_lossy(&output.stdout);
    info!("Podman is available: {}", version.trim());

    Ok(())
}

/// Builds and pushes container images with the podman CLI
#[derive(Debug, Clone)]
pub struct ImagePublisher {
    binary: String,
}

impl ImagePublisher {
    /// Creates a publisher invoking the given podman binary
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Builds `context_dir` and pushes the result as `image_ref`
    ///
    /// # Arguments
    /// * `context_dir` - Directory containing the Containerfile/Dockerfile
    /// * `image_ref` - Full remote reference, e.g. `registry.example.com/demo:abc123`
    pub fn publish(&self, context_dir: &Path, image_ref: &str) -> Result<()> {
        info!(
            "Building image {} from {}",
            image_ref,
            context_dir.display()
        );

        self.run(&[
            "build".to_string(),
            "--tag".to_string(),
            image_ref.to_string(),
            context_dir.to_string_lossy().to_string(),
        ])
        .with_context(|| format!("Failed to build image {}", image_ref))?;

        info!("Pushing image {}", image_ref);

        self.run(&["push".to_string(), image_ref.to_string()])
            .with_context(|| format!("Failed to push image {}", image_ref))?;

        info!("Image {} published", image_ref);
        Ok(())
    }

    /// Runs one podman command, failing on a non-zero exit
    fn run(&self, args: &[String]) -> Result<()> {
        debug!("Running {} {:?}", self.binary, args);

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .with_context(|| format!("Failed to execute {}", self.binary))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        // Always log stdout/stderr as debug
        if !stdout.trim().is_empty() {
            debug!("{} stdout: {}", self.binary, stdout.trim());
        }
        if !stderr.trim().is_empty() {
            debug!("{} stderr: {}", self.binary, stderr.trim());
        }

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let error_msg = format!(
                "{} {} exited with code {}: {}",
                self.binary,
                args.first().map(String::as_str).unwrap_or_default(),
                exit_code,
                stderr.trim()
            );

            error!("{}", error_msg);
            anyhow::bail!("{}", error_msg);
        }

        Ok(())
    }
}

impl Default for ImagePublisher {
    fn default() -> Self {
        Self::new("podman")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_an_error() {
        let publisher = ImagePublisher::new("trellis-no-such-podman-binary");
        let err = publisher
            .publish(Path::new("."), "registry.local/demo:abc123")
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to build image"));

        assert!(check_podman_available("trellis-no-such-podman-binary").is_err());
    }

    #[test]
    fn test_default_binary() {
        assert_eq!(ImagePublisher::default().binary(), "podman");
    }
}
