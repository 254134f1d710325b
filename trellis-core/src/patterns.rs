//! Pattern-set loading
//!
//! A pattern set is a JSON document with one list per pattern kind:
//!
//! ```json
//! {
//!   "functions": [{ "name": "demo-fn", "repository": "...", "branch": "main",
//!                   "runtime": "nodejs_14_x", "handler": "index.handler", "apiEnabled": true }],
//!   "services":  [{ "name": "demo-svc", "repository": "...", "branch": "main", "vpcId": "vpc-1",
//!                   "minInstances": 1, "maxInstances": 3, "cpuUnits": 256, "memoryMiB": 512 }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::pattern::{
    EnvironmentContext, FunctionPattern, PatternConfig, PatternKind, ServicePattern,
};
use crate::error::LoadError;

/// Fields shared by every pattern entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpec {
    pub name: String,
    pub repository: String,
    pub branch: String,
    #[serde(default)]
    pub revision: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEntry {
    #[serde(flatten)]
    pub source: SourceSpec,
    #[serde(flatten)]
    pub function: FunctionPattern,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    #[serde(flatten)]
    pub source: SourceSpec,
    #[serde(flatten)]
    pub service: ServicePattern,
}

/// Pattern configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSet {
    #[serde(default)]
    pub functions: Vec<FunctionEntry>,
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
}

impl PatternSet {
    /// Parses a pattern set from JSON text
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a pattern set from a file
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn len(&self) -> usize {
        self.functions.len() + self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattens the set into pattern configs, injecting the same environment
    /// into every one of them
    ///
    /// Functions come first, then services, each in document order.
    pub fn into_patterns(self, environment: &EnvironmentContext) -> Vec<PatternConfig> {
        let functions = self.functions.into_iter().map(|entry| {
            build(
                entry.source,
                environment,
                PatternKind::Function(entry.function),
            )
        });
        let services = self.services.into_iter().map(|entry| {
            build(
                entry.source,
                environment,
                PatternKind::Service(entry.service),
            )
        });
        functions.chain(services).collect()
    }
}

fn build(source: SourceSpec, environment: &EnvironmentContext, kind: PatternKind) -> PatternConfig {
    PatternConfig {
        name: source.name,
        repository: source.repository,
        branch: source.branch,
        revision: source.revision,
        environment: environment.clone(),
        kind,
    }
}
