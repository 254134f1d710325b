//! HTTP provisioning backend

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use trellis_core::domain::pattern::EnvironmentContext;
use trellis_core::domain::topology::{ResourceHandle, ResourceRequest};

use crate::Provisioner;
use crate::error::{ProvisionError, Result};
use crate::image::ImagePublisher;

/// Body of `POST /api/declarations`
#[derive(Debug, Serialize)]
struct DeclarationRequest<'a> {
    environment: &'a EnvironmentContext,
    resource: &'a ResourceRequest,
}

/// Client for a provisioning API
///
/// Endpoints:
/// - `POST /api/declarations` declares one resource and returns its handle
/// - `GET /api/networks/{id}` resolves an existing network (404 when unknown)
///
/// Image requests are built and pushed locally before being declared.
#[derive(Debug, Clone)]
pub struct HttpProvisioner {
    /// Base URL of the provisioning API (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
    images: ImagePublisher,
}

impl HttpProvisioner {
    /// Create a new provisioner client
    ///
    /// # Example
    /// ```
    /// use trellis_client::HttpProvisioner;
    ///
    /// let provisioner = HttpProvisioner::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new provisioner client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            images: ImagePublisher::default(),
        }
    }

    /// Use a custom image publisher (e.g. a different podman binary)
    pub fn with_image_publisher(mut self, images: ImagePublisher) -> Self {
        self.images = images;
        self
    }

    /// Get the base URL of the provisioning API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of one network, with `network_id` encoded as a single path segment
    fn network_url(&self, network_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ProvisionError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ProvisionError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "networks", network_id]);
        Ok(url)
    }

    /// Builds and pushes the image of an image request
    async fn publish_image(&self, request: &ResourceRequest) -> Result<()> {
        let ResourceRequest::Image(spec) = request else {
            return Ok(());
        };

        let image_ref = format!("{}:{}", spec.registry.reference, spec.tag);
        let context_dir = spec.context_dir.clone();
        let images = self.images.clone();

        // podman blocks for the whole build
        tokio::task::spawn_blocking(move || images.publish(&context_dir, &image_ref))
            .await
            .map_err(|e| ProvisionError::InternalError(format!("image task failed: {}", e)))?
            .map_err(|e| ProvisionError::ImagePublish(format!("{:#}", e)))
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProvisionError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ProvisionError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

#[async_trait]
impl Provisioner for HttpProvisioner {
    async fn declare(
        &self,
        environment: &EnvironmentContext,
        request: &ResourceRequest,
    ) -> Result<ResourceHandle> {
        self.publish_image(request).await?;

        debug!(
            "Declaring {} '{}' via {}",
            request.kind(),
            request.logical_id(),
            self.base_url
        );

        let url = format!("{}/api/declarations", self.base_url);
        let body = DeclarationRequest {
            environment,
            resource: request,
        };
        let response = self.client.post(&url).json(&body).send().await?;

        let handle: ResourceHandle = match self.handle_response(response).await {
            Ok(handle) => handle,
            Err(ProvisionError::ApiError { status, message })
                if status == StatusCode::UNPROCESSABLE_ENTITY.as_u16() =>
            {
                return Err(ProvisionError::Rejected(message));
            }
            Err(e) => return Err(e),
        };

        if handle.kind != request.kind() {
            return Err(ProvisionError::ParseError(format!(
                "expected a {} handle for '{}', got {}",
                request.kind(),
                request.logical_id(),
                handle.kind
            )));
        }

        info!("Declared {} '{}'", handle.kind, handle.logical_id);
        Ok(handle)
    }

    async fn lookup_network(
        &self,
        environment: &EnvironmentContext,
        network_id: &str,
    ) -> Result<Option<ResourceHandle>> {
        let url = self.network_url(network_id)?;

        let mut query = Vec::new();
        if let Some(account) = &environment.account {
            query.push(("account", account.as_str()));
        }
        if let Some(region) = &environment.region {
            query.push(("region", region.as_str()));
        }

        let response = self.client.get(url).query(&query).send().await?;

        match self.handle_response(response).await {
            Ok(handle) => Ok(Some(handle)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
