//! In-memory provisioning backend
//!
//! Records every call and answers with synthetic handles. Used for dry runs
//! (`trellis plan`) and as the collaborator in tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use trellis_core::domain::pattern::EnvironmentContext;
use trellis_core::domain::topology::{ResourceHandle, ResourceKind, ResourceRequest};

use crate::Provisioner;
use crate::error::{ProvisionError, Result};

/// One call observed by the recording provisioner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Declare {
        environment: EnvironmentContext,
        request: ResourceRequest,
    },
    LookupNetwork {
        environment: EnvironmentContext,
        network_id: String,
    },
}

/// Provisioner that keeps requests in memory
#[derive(Debug, Default)]
pub struct RecordingProvisioner {
    calls: Mutex<Vec<RecordedCall>>,
    /// `None` resolves every network id
    known_networks: Option<HashSet<String>>,
    failing_kind: Option<ResourceKind>,
}

impl RecordingProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only resolve the given network ids
    pub fn with_known_networks<I, S>(mut self, networks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_networks = Some(networks.into_iter().map(Into::into).collect());
        self
    }

    /// Reject every declaration of the given kind
    pub fn failing_on(mut self, kind: ResourceKind) -> Self {
        self.failing_kind = Some(kind);
        self
    }

    /// All calls, in the order they were made
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    /// Declaration requests only, in order
    pub fn declarations(&self) -> Vec<ResourceRequest> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Declare { request, .. } => Some(request.clone()),
                RecordedCall::LookupNetwork { .. } => None,
            })
            .collect()
    }

    /// Kinds of declared resources, in order
    pub fn declared_kinds(&self) -> Vec<ResourceKind> {
        self.declarations().iter().map(ResourceRequest::kind).collect()
    }

    /// Declarations whose logical id starts with `prefix`
    pub fn declarations_for(&self, prefix: &str) -> Vec<ResourceRequest> {
        self.declarations()
            .into_iter()
            .filter(|request| request.logical_id().starts_with(prefix))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn handle_for(request: &ResourceRequest) -> ResourceHandle {
        let kind = request.kind();
        let logical_id = request.logical_id().to_string();

        let (reference, endpoint) = match request {
            ResourceRequest::Registry(spec) => {
                (format!("registry.local/{}", spec.repository_name), None)
            }
            ResourceRequest::Image(spec) => {
                (format!("{}:{}", spec.registry.reference, spec.tag), None)
            }
            ResourceRequest::LoadBalancedService(spec) => (
                format!("plan:{}/{}", kind_slug(kind), logical_id),
                Some(format!("{}.internal", spec.load_balancer_name)),
            ),
            _ => (format!("plan:{}/{}", kind_slug(kind), logical_id), None),
        };

        ResourceHandle {
            kind,
            logical_id,
            reference,
            endpoint,
        }
    }
}

fn kind_slug(kind: ResourceKind) -> String {
    kind.to_string().replace(' ', "-")
}

#[async_trait]
impl Provisioner for RecordingProvisioner {
    async fn declare(
        &self,
        environment: &EnvironmentContext,
        request: &ResourceRequest,
    ) -> Result<ResourceHandle> {
        self.lock().push(RecordedCall::Declare {
            environment: environment.clone(),
            request: request.clone(),
        });

        if self.failing_kind == Some(request.kind()) {
            return Err(ProvisionError::Rejected(format!(
                "{} declarations are disabled",
                request.kind()
            )));
        }

        Ok(Self::handle_for(request))
    }

    async fn lookup_network(
        &self,
        environment: &EnvironmentContext,
        network_id: &str,
    ) -> Result<Option<ResourceHandle>> {
        self.lock().push(RecordedCall::LookupNetwork {
            environment: environment.clone(),
            network_id: network_id.to_string(),
        });

        let known = self
            .known_networks
            .as_ref()
            .is_none_or(|networks| networks.contains(network_id));

        Ok(known.then(|| ResourceHandle {
            kind: ResourceKind::Network,
            logical_id: network_id.to_string(),
            reference: format!("plan:network/{}", network_id),
            endpoint: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::domain::topology::{OutputSpec, RegistrySpec};

    fn registry() -> ResourceRequest {
        ResourceRequest::Registry(RegistrySpec {
            logical_id: "demo-registry".to_string(),
            repository_name: "demo".to_string(),
            remove_on_destroy: true,
        })
    }

    #[tokio::test]
    async fn test_records_declarations_in_order() {
        let provisioner = RecordingProvisioner::new();
        let env = EnvironmentContext::default();

        let handle = provisioner.declare(&env, &registry()).await.unwrap();
        assert_eq!(handle.reference, "registry.local/demo");

        let output = ResourceRequest::Output(OutputSpec {
            logical_id: "demo-endpoint".to_string(),
            value: "x".to_string(),
        });
        provisioner.declare(&env, &output).await.unwrap();

        assert_eq!(
            provisioner.declared_kinds(),
            vec![ResourceKind::Registry, ResourceKind::Output]
        );
        assert_eq!(provisioner.declarations_for("demo-").len(), 2);
        assert!(provisioner.declarations_for("other-").is_empty());
    }

    #[tokio::test]
    async fn test_known_networks() {
        let env = EnvironmentContext::default();

        let open = RecordingProvisioner::new();
        assert!(open.lookup_network(&env, "vpc-any").await.unwrap().is_some());

        let restricted = RecordingProvisioner::new().with_known_networks(["vpc-1"]);
        assert!(restricted.lookup_network(&env, "vpc-1").await.unwrap().is_some());
        assert!(restricted.lookup_network(&env, "vpc-2").await.unwrap().is_none());
        assert_eq!(restricted.calls().len(), 2);
        assert!(restricted.declarations().is_empty());
    }

    #[tokio::test]
    async fn test_failure_injection_still_records() {
        let provisioner = RecordingProvisioner::new().failing_on(ResourceKind::Registry);
        let err = provisioner
            .declare(&EnvironmentContext::default(), &registry())
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::Rejected(_)));
        assert_eq!(provisioner.declared_kinds(), vec![ResourceKind::Registry]);
    }
}
