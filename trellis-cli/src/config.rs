//! Configuration module
//!
//! Combines engine settings from the environment with command-line overrides.

use anyhow::{Context, Result};
use std::path::PathBuf;
use trellis_core::domain::pattern::EnvironmentContext;
use trellis_engine::EngineConfig;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    /// Account and region every pattern deploys into
    pub environment: EnvironmentContext,
}

/// Overrides given on the command line
#[derive(Debug, Default)]
pub struct Overrides {
    pub work_root: Option<PathBuf>,
    pub max_parallel: Option<usize>,
    pub account: Option<String>,
    pub region: Option<String>,
}

impl Config {
    /// Loads engine settings from the environment and applies `overrides`
    pub fn load(overrides: Overrides) -> Result<Self> {
        let engine = EngineConfig::from_env().context("Failed to load engine configuration")?;
        Self::with_engine(engine, overrides)
    }

    fn with_engine(mut engine: EngineConfig, overrides: Overrides) -> Result<Self> {
        if let Some(work_root) = overrides.work_root {
            engine.work_root = work_root;
        }
        if let Some(max_parallel) = overrides.max_parallel {
            engine = engine.with_max_parallel_patterns(max_parallel);
        }
        engine.validate().context("Invalid engine configuration")?;

        Ok(Self {
            engine,
            environment: EnvironmentContext {
                account: overrides.account,
                region: overrides.region,
            },
        })
    }
}
