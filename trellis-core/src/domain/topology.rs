//! Topology domain types
//!
//! Resource requests sent to the provisioning backend and the opaque handles
//! it returns. The engine never looks inside a handle beyond threading its
//! `reference` and `endpoint` into later requests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Kind of a declared (or looked-up) resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ComputeUnit,
    HttpTrigger,
    ScheduleTrigger,
    Registry,
    Image,
    Network,
    Cluster,
    Role,
    TaskDefinition,
    LoadBalancedService,
    AutoscalingRule,
    Output,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::ComputeUnit => "compute unit",
            ResourceKind::HttpTrigger => "http trigger",
            ResourceKind::ScheduleTrigger => "schedule trigger",
            ResourceKind::Registry => "registry",
            ResourceKind::Image => "image",
            ResourceKind::Network => "network",
            ResourceKind::Cluster => "cluster",
            ResourceKind::Role => "role",
            ResourceKind::TaskDefinition => "task definition",
            ResourceKind::LoadBalancedService => "load-balanced service",
            ResourceKind::AutoscalingRule => "autoscaling rule",
            ResourceKind::Output => "output",
        };
        f.write_str(label)
    }
}

/// Opaque handle returned by the provisioning backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceHandle {
    pub kind: ResourceKind,
    pub logical_id: String,
    /// Backend reference (ARN, URI, id...) used by dependent requests
    pub reference: String,
    /// Network address, only set for resources that expose one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// A single resource declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceRequest {
    ComputeUnit(ComputeUnitSpec),
    HttpTrigger(HttpTriggerSpec),
    ScheduleTrigger(ScheduleTriggerSpec),
    Registry(RegistrySpec),
    Image(ImageSpec),
    Cluster(ClusterSpec),
    Role(RoleSpec),
    TaskDefinition(TaskDefinitionSpec),
    LoadBalancedService(LoadBalancedServiceSpec),
    AutoscalingRule(AutoscalingRuleSpec),
    Output(OutputSpec),
}

impl ResourceRequest {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceRequest::ComputeUnit(_) => ResourceKind::ComputeUnit,
            ResourceRequest::HttpTrigger(_) => ResourceKind::HttpTrigger,
            ResourceRequest::ScheduleTrigger(_) => ResourceKind::ScheduleTrigger,
            ResourceRequest::Registry(_) => ResourceKind::Registry,
            ResourceRequest::Image(_) => ResourceKind::Image,
            ResourceRequest::Cluster(_) => ResourceKind::Cluster,
            ResourceRequest::Role(_) => ResourceKind::Role,
            ResourceRequest::TaskDefinition(_) => ResourceKind::TaskDefinition,
            ResourceRequest::LoadBalancedService(_) => ResourceKind::LoadBalancedService,
            ResourceRequest::AutoscalingRule(_) => ResourceKind::AutoscalingRule,
            ResourceRequest::Output(_) => ResourceKind::Output,
        }
    }

    pub fn logical_id(&self) -> &str {
        match self {
            ResourceRequest::ComputeUnit(spec) => &spec.logical_id,
            ResourceRequest::HttpTrigger(spec) => &spec.logical_id,
            ResourceRequest::ScheduleTrigger(spec) => &spec.logical_id,
            ResourceRequest::Registry(spec) => &spec.logical_id,
            ResourceRequest::Image(spec) => &spec.logical_id,
            ResourceRequest::Cluster(spec) => &spec.logical_id,
            ResourceRequest::Role(spec) => &spec.logical_id,
            ResourceRequest::TaskDefinition(spec) => &spec.logical_id,
            ResourceRequest::LoadBalancedService(spec) => &spec.logical_id,
            ResourceRequest::AutoscalingRule(spec) => &spec.logical_id,
            ResourceRequest::Output(spec) => &spec.logical_id,
        }
    }
}

/// Serverless compute unit packaged from a local directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeUnitSpec {
    pub logical_id: String,
    /// Backend runtime identifier, e.g. `nodejs14.x`
    pub runtime: String,
    pub handler: String,
    pub code_dir: PathBuf,
}

/// Public HTTP trigger proxying every path and method to one compute unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpTriggerSpec {
    pub logical_id: String,
    pub target: ResourceHandle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTriggerSpec {
    pub logical_id: String,
    pub target: ResourceHandle,
    pub expression: String,
}

/// Image registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySpec {
    pub logical_id: String,
    pub repository_name: String,
    /// Delete the registry together with the topology
    pub remove_on_destroy: bool,
}

/// Container image built from a local directory and published to a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    pub logical_id: String,
    pub context_dir: PathBuf,
    pub registry: ResourceHandle,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub logical_id: String,
    pub network: ResourceHandle,
}

/// Identity assumed by a service principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSpec {
    pub logical_id: String,
    pub role_name: String,
    /// Service principal allowed to assume the role
    pub assumed_by: String,
}

/// Allow statement granting `actions` on `resources`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionStatement {
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

/// Task definition running a single container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinitionSpec {
    pub logical_id: String,
    pub container_name: String,
    pub image: ResourceHandle,
    /// Role assumed by the running container
    pub task_role: ResourceHandle,
    /// Granted to the execution role that pulls the image and ships logs
    pub execution_permissions: Vec<PermissionStatement>,
    pub cpu_units: u32,
    pub memory_mib: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_mapping: Option<PortMapping>,
    pub environment: BTreeMap<String, String>,
    pub log_stream_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub container_port: u16,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

/// Load-balanced service front-ending a task definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancedServiceSpec {
    pub logical_id: String,
    pub cluster: ResourceHandle,
    pub task_definition: ResourceHandle,
    pub load_balancer_name: String,
    pub listener_port: u16,
    pub public: bool,
}

/// Utilization metric driving an autoscaling rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMetric {
    CpuUtilization,
    MemoryUtilization,
}

/// Target-tracking autoscaling rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalingRuleSpec {
    pub logical_id: String,
    pub service: ResourceHandle,
    pub metric: ScalingMetric,
    pub target_utilization_percent: u8,
    pub scale_in_cooldown_secs: u64,
    pub scale_out_cooldown_secs: u64,
    pub min_capacity: u32,
    pub max_capacity: u32,
}

/// Named value exported by the topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSpec {
    pub logical_id: String,
    pub value: String,
}

/// Everything declared for one pattern
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredTopology {
    pub resources: Vec<ResourceHandle>,
    pub outputs: BTreeMap<String, String>,
}
