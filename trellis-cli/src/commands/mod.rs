//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod deploy;
mod plan;
mod validate;

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use trellis_client::Provisioner;
use trellis_core::domain::pattern::{EnvironmentContext, PatternConfig};
use trellis_core::domain::run::RunReport;
use trellis_core::patterns::PatternSet;
use trellis_engine::{GitSource, Orchestrator};

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Deploy every pattern of a pattern set
    Deploy {
        /// Pattern set (JSON)
        file: PathBuf,

        /// Base URL of the provisioning API
        #[arg(long, env = "TRELLIS_PROVISIONER_URL")]
        provisioner_url: String,

        /// Podman executable used to build and push service images
        #[arg(long, default_value = "podman")]
        podman_bin: String,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stage sources and print the declarations a deployment would issue
    Plan {
        /// Pattern set (JSON)
        file: PathBuf,

        /// Only resolve these network ids (default: every id resolves)
        #[arg(long = "known-network")]
        known_networks: Vec<String>,

        /// Print the report and declarations as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check a pattern set without fetching anything
    Validate {
        /// Pattern set (JSON)
        file: PathBuf,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module and returns the
/// process exit status.
pub async fn handle_command(command: Commands, config: &Config) -> Result<ExitCode> {
    match command {
        Commands::Deploy {
            file,
            provisioner_url,
            podman_bin,
            json,
        } => deploy::run(config, &file, &provisioner_url, &podman_bin, json).await,
        Commands::Plan {
            file,
            known_networks,
            json,
        } => plan::run(config, &file, known_networks, json).await,
        Commands::Validate { file } => validate::run(config, &file),
    }
}

/// Reads a pattern set and resolves it against the target environment
fn load_patterns(file: &Path, environment: &EnvironmentContext) -> Result<Vec<PatternConfig>> {
    let set = PatternSet::load(file)
        .with_context(|| format!("Failed to load pattern set {}", file.display()))?;
    if set.is_empty() {
        anyhow::bail!("Pattern set {} contains no patterns", file.display());
    }
    Ok(set.into_patterns(environment))
}

/// Runs `patterns` with git-staged sources against `provisioner`
async fn run_patterns(
    config: &Config,
    provisioner: Arc<dyn Provisioner>,
    patterns: Vec<PatternConfig>,
) -> Result<RunReport> {
    let scm = Arc::new(GitSource::new());
    let orchestrator = Orchestrator::new(config.engine.clone(), scm, provisioner);

    orchestrator
        .run(patterns)
        .await
        .context("Pre-flight check failed")
}

fn exit_code(report: &RunReport) -> ExitCode {
    if report.exit_code() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
