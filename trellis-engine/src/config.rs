//! Engine configuration
//!
//! Defines the configurable parameters of a deployment run: where sources
//! are staged and how many patterns run at once.

use std::path::PathBuf;

/// Default staging root, relative to the working directory
pub const DEFAULT_WORK_ROOT: &str = ".trellis/staging";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory under which each pattern gets `<work_root>/<name>`
    pub work_root: PathBuf,

    /// Maximum number of patterns processed concurrently
    pub max_parallel_patterns: usize,
}

impl EngineConfig {
    /// Creates a new configuration with defaults
    pub fn new(work_root: impl Into<PathBuf>) -> Self {
        Self {
            work_root: work_root.into(),
            max_parallel_patterns: 4,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Recognised environment variables:
    /// - TRELLIS_WORK_ROOT (optional, default: .trellis/staging)
    /// - TRELLIS_MAX_PARALLEL (optional, default: 4)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(work_root) = var("TRELLIS_WORK_ROOT") {
            config.work_root = PathBuf::from(work_root);
        }

        if let Some(raw) = var("TRELLIS_MAX_PARALLEL") {
            config.max_parallel_patterns = raw.trim().parse::<usize>().map_err(|_| {
                anyhow::anyhow!("TRELLIS_MAX_PARALLEL must be a positive integer, got '{}'", raw)
            })?;
        }

        Ok(config)
    }

    pub fn with_max_parallel_patterns(mut self, max_parallel_patterns: usize) -> Self {
        self.max_parallel_patterns = max_parallel_patterns;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.work_root.as_os_str().is_empty() {
            anyhow::bail!("work_root cannot be empty");
        }

        if self.max_parallel_patterns == 0 {
            anyhow::bail!("max_parallel_patterns must be greater than 0");
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_ROOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.work_root, PathBuf::from(".trellis/staging"));
        assert_eq!(config.max_parallel_patterns, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        assert!(config.validate().is_ok());

        config.max_parallel_patterns = 0;
        assert!(config.validate().is_err());
        config.max_parallel_patterns = 1;

        config.work_root = PathBuf::new();
        assert!(config.validate().is_err());
        config.work_root = PathBuf::from("/tmp/trellis");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_vars() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("TRELLIS_WORK_ROOT", "/var/lib/trellis"),
            ("TRELLIS_MAX_PARALLEL", "8"),
        ]);

        let config = EngineConfig::from_vars(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.work_root, PathBuf::from("/var/lib/trellis"));
        assert_eq!(config.max_parallel_patterns, 8);
    }

    #[test]
    fn test_from_vars_rejects_bad_parallelism() {
        let result = EngineConfig::from_vars(|key| {
            (key == "TRELLIS_MAX_PARALLEL").then(|| "many".to_string())
        });
        assert!(result.is_err());
    }
}
