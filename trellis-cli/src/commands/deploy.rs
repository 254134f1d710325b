//! Deploy command

use anyhow::{Context, Result};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use trellis_client::{HttpProvisioner, ImagePublisher, check_podman_available};
use trellis_core::domain::pattern::PatternKind;

use super::{exit_code, load_patterns, run_patterns};
use crate::config::Config;
use crate::output;

/// Deploys every pattern of `file` through the provisioning API
pub async fn run(
    config: &Config,
    file: &Path,
    provisioner_url: &str,
    podman_bin: &str,
    json: bool,
) -> Result<ExitCode> {
    let patterns = load_patterns(file, &config.environment)?;

    // services publish images
    if patterns
        .iter()
        .any(|p| matches!(p.kind, PatternKind::Service(_)))
    {
        check_podman_available(podman_bin).context("Service patterns need podman")?;
    }

    info!(
        "Deploying {} pattern(s) through {}",
        patterns.len(),
        provisioner_url
    );
    let provisioner = HttpProvisioner::new(provisioner_url)
        .with_image_publisher(ImagePublisher::new(podman_bin));

    let report = run_patterns(config, Arc::new(provisioner), patterns).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_report(&report);
    }

    Ok(exit_code(&report))
}
