//! Topology declaration
//!
//! Maps one validated pattern onto resource declarations against a
//! [`Provisioner`]. Declarations are issued strictly in order because later
//! requests carry the handles of earlier ones.

mod function;
mod service;

pub use service::{
    SCALE_IN_COOLDOWN, SCALE_OUT_COOLDOWN, TARGET_UTILIZATION_PERCENT, image_tag,
};

use std::sync::Arc;
use tracing::{debug, info};
use trellis_client::Provisioner;
use trellis_core::DeployError;
use trellis_core::domain::pattern::{EnvironmentContext, PatternConfig, PatternKind};
use trellis_core::domain::topology::{
    DeclaredTopology, ResourceHandle, ResourceKind, ResourceRequest,
};

use crate::source::StagedSource;

/// Logical id of a resource belonging to pattern `name`
pub(crate) fn logical_id(name: &str, suffix: &str) -> String {
    format!("{}-{}", name, suffix)
}

/// Declares pattern topologies through a provisioning backend
pub struct TopologyBuilder {
    provisioner: Arc<dyn Provisioner>,
}

impl TopologyBuilder {
    pub fn new(provisioner: Arc<dyn Provisioner>) -> Self {
        Self { provisioner }
    }

    /// Declares the whole topology of `config`
    pub async fn declare(
        &self,
        config: &PatternConfig,
        staged: &StagedSource,
    ) -> Result<DeclaredTopology, DeployError> {
        let mut topology = DeclaredTopology::default();
        self.declare_into(config, staged, &mut topology).await?;
        Ok(topology)
    }

    /// Declares the topology of `config`, recording every handle in `topology`
    ///
    /// On failure `topology` holds whatever was declared before the error,
    /// which may need reconciliation outside of this tool.
    pub async fn declare_into(
        &self,
        config: &PatternConfig,
        staged: &StagedSource,
        topology: &mut DeclaredTopology,
    ) -> Result<(), DeployError> {
        config.validate()?;

        info!(
            "Declaring {} topology for '{}'",
            config.kind.label(),
            config.name
        );

        let mut session = Declarations {
            provisioner: self.provisioner.as_ref(),
            environment: &config.environment,
            topology,
        };

        match &config.kind {
            PatternKind::Function(function) => {
                function::declare(&mut session, config, function, staged).await?
            }
            PatternKind::Service(service) => {
                service::declare(&mut session, config, service, staged).await?
            }
        }

        info!(
            "Declared {} resource(s) for '{}'",
            session.topology.resources.len(),
            config.name
        );
        Ok(())
    }
}

/// Ordered declarations of one pattern
pub(crate) struct Declarations<'a> {
    provisioner: &'a dyn Provisioner,
    environment: &'a EnvironmentContext,
    topology: &'a mut DeclaredTopology,
}

impl Declarations<'_> {
    /// Declares one resource and records its handle
    pub(crate) async fn declare(
        &mut self,
        request: ResourceRequest,
    ) -> Result<ResourceHandle, DeployError> {
        debug!("Declaring {} '{}'", request.kind(), request.logical_id());

        let handle = self
            .provisioner
            .declare(self.environment, &request)
            .await
            .map_err(|e| DeployError::Declaration {
                kind: request.kind(),
                logical_id: request.logical_id().to_string(),
                message: e.to_string(),
            })?;

        self.topology.resources.push(handle.clone());
        Ok(handle)
    }

    /// Resolves an existing network
    pub(crate) async fn lookup_network(
        &mut self,
        network_id: &str,
    ) -> Result<ResourceHandle, DeployError> {
        self.provisioner
            .lookup_network(self.environment, network_id)
            .await
            .map_err(|e| DeployError::Declaration {
                kind: ResourceKind::Network,
                logical_id: network_id.to_string(),
                message: e.to_string(),
            })?
            .ok_or_else(|| DeployError::NetworkNotFound(network_id.to_string()))
    }

    pub(crate) fn add_output(&mut self, key: String, value: String) {
        self.topology.outputs.insert(key, value);
    }
}
