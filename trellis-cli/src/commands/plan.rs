//! Plan command
//!
//! Stages every source like a deployment would, but declares against the
//! in-memory provisioner and prints what would have been requested.

use anyhow::Result;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use trellis_client::RecordingProvisioner;

use super::{exit_code, load_patterns, run_patterns};
use crate::config::Config;
use crate::output;

pub async fn run(
    config: &Config,
    file: &Path,
    known_networks: Vec<String>,
    json: bool,
) -> Result<ExitCode> {
    let patterns = load_patterns(file, &config.environment)?;

    info!("Planning {} pattern(s)", patterns.len());

    let mut provisioner = RecordingProvisioner::new();
    if !known_networks.is_empty() {
        provisioner = provisioner.with_known_networks(known_networks);
    }
    let provisioner = Arc::new(provisioner);

    let report = run_patterns(config, provisioner.clone(), patterns).await?;
    let declarations = provisioner.declarations();

    if json {
        let plan = serde_json::json!({
            "report": report,
            "declarations": declarations,
        });
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        output::print_declarations(&declarations);
        println!();
        output::print_report(&report);
    }

    Ok(exit_code(&report))
}
