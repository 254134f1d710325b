//! Trellis provisioning clients
//!
//! The engine declares resources through the [`Provisioner`] trait and never
//! depends on a concrete backend. This crate ships two implementations:
//!
//! - [`HttpProvisioner`]: posts declarations to a provisioning API and builds
//!   container images locally with podman before declaring them
//! - [`RecordingProvisioner`]: keeps every request in memory and answers with
//!   synthetic handles (dry runs and tests)
//!
//! # Example
//!
//! ```no_run
//! use trellis_client::{HttpProvisioner, Provisioner};
//! use trellis_core::domain::pattern::EnvironmentContext;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provisioner = HttpProvisioner::new("http://localhost:8080");
//!     let network = provisioner
//!         .lookup_network(&EnvironmentContext::default(), "vpc-0a1b2c")
//!         .await?;
//!
//!     println!("network found: {}", network.is_some());
//!     Ok(())
//! }
//! ```

pub mod error;
mod http;
mod image;
mod recording;

pub use error::{ProvisionError, Result};
pub use http::HttpProvisioner;
pub use image::{ImagePublisher, check_podman_available};
pub use recording::{RecordedCall, RecordingProvisioner};

use async_trait::async_trait;
use trellis_core::domain::pattern::EnvironmentContext;
use trellis_core::domain::topology::{ResourceHandle, ResourceRequest};

/// Provisioning backend seam
///
/// Every call is synchronous from the caller's point of view: the handle is
/// returned once the backend accepted the declaration, and failures surface
/// immediately.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Declares one resource and returns its handle
    async fn declare(
        &self,
        environment: &EnvironmentContext,
        request: &ResourceRequest,
    ) -> Result<ResourceHandle>;

    /// Resolves an existing network by id
    ///
    /// Returns `Ok(None)` when the backend does not know the network.
    async fn lookup_network(
        &self,
        environment: &EnvironmentContext,
        network_id: &str,
    ) -> Result<Option<ResourceHandle>>;
}
