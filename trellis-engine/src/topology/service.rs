//! Service pattern topology
//!
//! Order: registry, image, network lookup, cluster, task role, task definition, and,
//! only with a load balancer, the service, its two autoscaling rules and the
//! endpoint output.

use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};
use trellis_core::DeployError;
use trellis_core::domain::pattern::{PatternConfig, ServicePattern};
use trellis_core::domain::topology::{
    AutoscalingRuleSpec, ClusterSpec, ImageSpec, LoadBalancedServiceSpec, OutputSpec,
    PermissionStatement, PortMapping, Protocol, RegistrySpec, ResourceHandle, ResourceKind,
    ResourceRequest, RoleSpec, ScalingMetric, TaskDefinitionSpec,
};

use super::{Declarations, logical_id};
use crate::source::StagedSource;

/// Utilization both autoscaling rules aim for
pub const TARGET_UTILIZATION_PERCENT: u8 = 50;

/// Scale in slower than out so transient dips do not shrink the service
pub const SCALE_IN_COOLDOWN: Duration = Duration::from_secs(120);

pub const SCALE_OUT_COOLDOWN: Duration = Duration::from_secs(60);

/// Service principal of container tasks
pub const TASK_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

/// Actions the execution role needs to pull the image and ship logs
pub const EXECUTION_ACTIONS: [&str; 6] = [
    "ecr:GetAuthorizationToken",
    "ecr:BatchCheckLayerAvailability",
    "ecr:GetDownloadUrlForLayer",
    "ecr:BatchGetImage",
    "logs:CreateLogStream",
    "logs:PutLogEvents",
];

/// Longest tag a registry accepts
const MAX_TAG_LEN: usize = 128;

/// Image tag for a staged source
///
/// The revision when pinned, otherwise the branch. Characters outside
/// `[A-Za-z0-9_.-]` become `-`.
pub fn image_tag(revision: Option<&str>, branch: &str) -> String {
    let source = revision.unwrap_or(branch);
    let mut tag: String = source
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .take(MAX_TAG_LEN)
        .collect();

    // tags cannot start with '.' or '-'
    if tag.starts_with(['.', '-']) {
        tag.replace_range(..1, "_");
    }
    tag
}

pub(super) async fn declare(
    session: &mut Declarations<'_>,
    config: &PatternConfig,
    service: &ServicePattern,
    staged: &StagedSource,
) -> Result<(), DeployError> {
    let name = config.name.as_str();
    let tag = image_tag(staged.revision.as_deref(), &staged.branch);

    let registry = session
        .declare(ResourceRequest::Registry(RegistrySpec {
            logical_id: logical_id(name, "registry"),
            repository_name: name.to_string(),
            remove_on_destroy: true,
        }))
        .await?;

    let image = session
        .declare(ResourceRequest::Image(ImageSpec {
            logical_id: logical_id(name, "image"),
            context_dir: staged.path.clone(),
            registry,
            tag: tag.clone(),
        }))
        .await?;

    let network = session.lookup_network(&service.vpc_id).await?;
    debug!("Resolved network {} for '{}'", network.reference, name);

    let cluster = session
        .declare(ResourceRequest::Cluster(ClusterSpec {
            logical_id: logical_id(name, "cluster"),
            network,
        }))
        .await?;

    let task_role = session
        .declare(ResourceRequest::Role(RoleSpec {
            logical_id: logical_id(name, "role"),
            role_name: logical_id(name, "role"),
            assumed_by: TASK_PRINCIPAL.to_string(),
        }))
        .await?;

    let task_definition = session
        .declare(ResourceRequest::TaskDefinition(TaskDefinitionSpec {
            logical_id: logical_id(name, "task"),
            container_name: name.to_string(),
            image,
            task_role,
            execution_permissions: vec![PermissionStatement {
                actions: EXECUTION_ACTIONS.iter().map(|a| a.to_string()).collect(),
                resources: vec!["*".to_string()],
            }],
            cpu_units: service.cpu_units,
            memory_mib: service.memory_mib,
            port_mapping: service.container_port.map(|container_port| PortMapping {
                container_port,
                protocol: Protocol::Tcp,
            }),
            environment: BTreeMap::from([("COMMIT".to_string(), tag)]),
            log_stream_prefix: name.to_string(),
        }))
        .await?;

    if !service.load_balancer_enabled {
        if service.service_port.is_some() {
            warn!(
                "servicePort of '{}' is ignored because loadBalancerEnabled is false",
                name
            );
        }
        return Ok(());
    }

    let listener_port = service.service_port.ok_or_else(|| DeployError::InvalidConfig {
        name: name.to_string(),
        reason: "servicePort is required when loadBalancerEnabled is true".to_string(),
    })?;

    let lb_service = session
        .declare(ResourceRequest::LoadBalancedService(LoadBalancedServiceSpec {
            logical_id: logical_id(name, "service"),
            cluster,
            task_definition,
            load_balancer_name: logical_id(name, "lb"),
            listener_port,
            public: false,
        }))
        .await?;

    for (suffix, metric) in [
        ("cpu-scaling", ScalingMetric::CpuUtilization),
        ("memory-scaling", ScalingMetric::MemoryUtilization),
    ] {
        session
            .declare(ResourceRequest::AutoscalingRule(scaling_rule(
                logical_id(name, suffix),
                &lb_service,
                metric,
                service,
            )))
            .await?;
    }

    let endpoint = lb_service
        .endpoint
        .clone()
        .ok_or_else(|| DeployError::Declaration {
            kind: ResourceKind::LoadBalancedService,
            logical_id: lb_service.logical_id.clone(),
            message: "backend returned no endpoint".to_string(),
        })?;

    let output_id = logical_id(name, "endpoint");
    session
        .declare(ResourceRequest::Output(OutputSpec {
            logical_id: output_id.clone(),
            value: endpoint.clone(),
        }))
        .await?;
    session.add_output(output_id, endpoint);

    Ok(())
}

fn scaling_rule(
    logical_id: String,
    service: &ResourceHandle,
    metric: ScalingMetric,
    pattern: &ServicePattern,
) -> AutoscalingRuleSpec {
    AutoscalingRuleSpec {
        logical_id,
        service: service.clone(),
        metric,
        target_utilization_percent: TARGET_UTILIZATION_PERCENT,
        scale_in_cooldown_secs: SCALE_IN_COOLDOWN.as_secs(),
        scale_out_cooldown_secs: SCALE_OUT_COOLDOWN.as_secs(),
        min_capacity: pattern.min_instances,
        max_capacity: pattern.max_instances,
    }
}
