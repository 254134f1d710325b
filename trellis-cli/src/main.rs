//! Trellis CLI
//!
//! Deploys function and service patterns from their source repositories.
//!
//! Exit status: 0 when every pattern succeeded, 1 when at least one pattern
//! failed, 2 when the run could not start (bad input, pre-flight failure).

mod commands;
mod config;
mod output;

use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{Commands, handle_command};
use config::{Config, Overrides};

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Deploy function and service patterns from source", long_about = None)]
struct Cli {
    /// Directory sources are staged under (overrides TRELLIS_WORK_ROOT)
    #[arg(long, global = true)]
    work_root: Option<PathBuf>,

    /// Maximum number of patterns processed at once (overrides TRELLIS_MAX_PARALLEL)
    #[arg(long, global = true)]
    max_parallel: Option<usize>,

    /// Target account
    #[arg(long, global = true, env = "TRELLIS_ACCOUNT")]
    account: Option<String>,

    /// Target region
    #[arg(long, global = true, env = "TRELLIS_REGION")]
    region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trellis=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let overrides = Overrides {
        work_root: cli.work_root,
        max_parallel: cli.max_parallel,
        account: cli.account,
        region: cli.region,
    };

    let result = match Config::load(overrides) {
        Ok(config) => handle_command(cli.command, &config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}
