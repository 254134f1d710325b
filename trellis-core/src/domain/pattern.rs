//! Pattern domain types
//!
//! A pattern is one deployable unit: where its source lives, which revision
//! to build, and the parameters of its topology.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DeployError;

/// Maximum length of a pattern name (it doubles as a directory name)
pub const MAX_NAME_LEN: usize = 64;

/// Ambient deployment target, injected uniformly into every pattern
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentContext {
    pub account: Option<String>,
    pub region: Option<String>,
}

/// One deployment instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternConfig {
    pub name: String,
    pub repository: String,
    pub branch: String,
    pub revision: Option<String>,
    #[serde(default)]
    pub environment: EnvironmentContext,
    pub kind: PatternKind,
}

/// Kind-specific parameters of a pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PatternKind {
    Function(FunctionPattern),
    Service(ServicePattern),
}

impl PatternKind {
    pub fn label(&self) -> &'static str {
        match self {
            PatternKind::Function(_) => "function",
            PatternKind::Service(_) => "service",
        }
    }
}

/// Serverless function parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionPattern {
    /// Runtime identifier, resolved against [`Runtime`] at declaration time
    pub runtime: String,
    /// Entry-point descriptor, e.g. `index.handler`
    pub handler: String,
    #[serde(default)]
    pub api_enabled: bool,
    /// Optional schedule expression, e.g. `rate(5 minutes)`
    #[serde(default)]
    pub schedule: Option<String>,
}

/// Containerized service parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePattern {
    pub vpc_id: String,
    pub min_instances: u32,
    pub max_instances: u32,
    pub cpu_units: u32,
    #[serde(rename = "memoryMiB")]
    pub memory_mib: u32,
    #[serde(default)]
    pub container_port: Option<u16>,
    #[serde(default)]
    pub service_port: Option<u16>,
    #[serde(default)]
    pub load_balancer_enabled: bool,
}

/// Supported function runtimes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Runtime {
    #[serde(rename = "nodejs_14_x")]
    Nodejs14x,
    #[serde(rename = "python_3_9")]
    Python39,
}

impl Runtime {
    pub const ALL: [Runtime; 2] = [Runtime::Nodejs14x, Runtime::Python39];

    /// Configuration spelling, e.g. `nodejs_14_x`
    pub fn config_name(&self) -> &'static str {
        match self {
            Runtime::Nodejs14x => "nodejs_14_x",
            Runtime::Python39 => "python_3_9",
        }
    }

    /// Identifier understood by the provisioning backend, e.g. `nodejs14.x`
    pub fn identifier(&self) -> &'static str {
        match self {
            Runtime::Nodejs14x => "nodejs14.x",
            Runtime::Python39 => "python3.9",
        }
    }
}

impl FromStr for Runtime {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Runtime::ALL
            .into_iter()
            .find(|runtime| runtime.config_name() == s)
            .ok_or_else(|| DeployError::UnsupportedRuntime(s.to_string()))
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

impl PatternConfig {
    /// Checks the invariants of this pattern
    ///
    /// The runtime of a function pattern is resolved by the topology builder,
    /// not here.
    pub fn validate(&self) -> Result<(), DeployError> {
        validate_name(&self.name)?;

        if self.repository.trim().is_empty() {
            return Err(self.invalid("repository cannot be empty"));
        }
        if self.branch.trim().is_empty() {
            return Err(self.invalid("branch cannot be empty"));
        }
        if matches!(&self.revision, Some(rev) if rev.trim().is_empty()) {
            return Err(self.invalid("revision cannot be empty when set"));
        }
        // refs are passed to git as positional arguments
        if self.branch.starts_with('-') || matches!(&self.revision, Some(rev) if rev.starts_with('-'))
        {
            return Err(self.invalid("branch and revision cannot start with '-'"));
        }

        match &self.kind {
            PatternKind::Function(function) => self.validate_function(function),
            PatternKind::Service(service) => self.validate_service(service),
        }
    }

    fn validate_function(&self, function: &FunctionPattern) -> Result<(), DeployError> {
        let handler = function.handler.as_str();
        if handler.is_empty() {
            return Err(self.invalid("handler cannot be empty"));
        }
        // exactly one entry point
        if handler.contains(',') || handler.chars().any(char::is_whitespace) {
            return Err(self.invalid(format!(
                "handler '{}' must name a single entry point",
                handler
            )));
        }
        if matches!(&function.schedule, Some(expr) if expr.trim().is_empty()) {
            return Err(self.invalid("schedule cannot be empty when set"));
        }
        Ok(())
    }

    fn validate_service(&self, service: &ServicePattern) -> Result<(), DeployError> {
        if service.vpc_id.trim().is_empty() {
            return Err(self.invalid("vpcId cannot be empty"));
        }
        if service.max_instances == 0 {
            return Err(self.invalid("maxInstances must be greater than 0"));
        }
        if service.min_instances > service.max_instances {
            return Err(self.invalid(format!(
                "minInstances ({}) exceeds maxInstances ({})",
                service.min_instances, service.max_instances
            )));
        }
        if service.cpu_units == 0 {
            return Err(self.invalid("cpuUnits must be greater than 0"));
        }
        if service.memory_mib == 0 {
            return Err(self.invalid("memoryMiB must be greater than 0"));
        }
        if service.load_balancer_enabled && service.service_port.is_none() {
            return Err(self.invalid("servicePort is required when loadBalancerEnabled is true"));
        }
        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> DeployError {
        DeployError::InvalidConfig {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }
}

/// Checks that a pattern name can be used as a directory and resource-group name
pub fn validate_name(name: &str) -> Result<(), DeployError> {
    let invalid = |reason: &str| DeployError::InvalidConfig {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name is longer than 64 characters"));
    }
    if name.starts_with('.') || name.starts_with('-') {
        return Err(invalid("name cannot start with '.' or '-'"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(invalid(
            "name may only contain ASCII letters, digits, '-', '_' and '.'",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(min: u32, max: u32) -> PatternConfig {
        PatternConfig {
            name: "demo-svc".to_string(),
            repository: "https://example.com/demo.git".to_string(),
            branch: "main".to_string(),
            revision: Some("abc123".to_string()),
            environment: EnvironmentContext::default(),
            kind: PatternKind::Service(ServicePattern {
                vpc_id: "vpc-1".to_string(),
                min_instances: min,
                max_instances: max,
                cpu_units: 256,
                memory_mib: 512,
                container_port: None,
                service_port: Some(80),
                load_balancer_enabled: true,
            }),
        }
    }

    fn function(handler: &str) -> PatternConfig {
        PatternConfig {
            name: "demo-fn".to_string(),
            repository: "https://example.com/demo.git".to_string(),
            branch: "main".to_string(),
            revision: None,
            environment: EnvironmentContext::default(),
            kind: PatternKind::Function(FunctionPattern {
                runtime: "nodejs_14_x".to_string(),
                handler: handler.to_string(),
                api_enabled: true,
                schedule: None,
            }),
        }
    }

    #[test]
    fn test_valid_patterns() {
        assert!(service(1, 3).validate().is_ok());
        assert!(service(2, 2).validate().is_ok());
        assert!(function("index.handler").validate().is_ok());
    }

    #[test]
    fn test_min_above_max_is_rejected() {
        let err = service(4, 3).validate().unwrap_err();
        assert!(matches!(err, DeployError::InvalidConfig { .. }));
        assert!(err.to_string().contains("exceeds maxInstances"));
    }

    #[test]
    fn test_load_balancer_requires_service_port() {
        let mut config = service(1, 3);
        if let PatternKind::Service(svc) = &mut config.kind {
            svc.service_port = None;
        }
        assert!(config.validate().is_err());

        if let PatternKind::Service(svc) = &mut config.kind {
            svc.load_balancer_enabled = false;
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_handler_must_be_single_entry_point() {
        assert!(function("").validate().is_err());
        assert!(function("index.a,index.b").validate().is_err());
        assert!(function("index.a index.b").validate().is_err());
    }

    #[test]
    fn test_name_must_be_filesystem_safe() {
        assert!(validate_name("demo-fn_1.0").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("-flag").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_runtime_resolution() {
        assert_eq!("nodejs_14_x".parse::<Runtime>().unwrap(), Runtime::Nodejs14x);
        assert_eq!("python_3_9".parse::<Runtime>().unwrap().identifier(), "python3.9");

        let err = "cobol_85".parse::<Runtime>().unwrap_err();
        assert!(matches!(err, DeployError::UnsupportedRuntime(ref r) if r == "cobol_85"));

        for name in ["nodejs_12_x", "python_3_7", "python_3_8"] {
            let err = name.parse::<Runtime>().unwrap_err();
            assert!(matches!(err, DeployError::UnsupportedRuntime(_)), "{} accepted", name);
        }
    }
}
