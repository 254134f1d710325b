//! Error types for provisioning clients

use thiserror::Error;

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Errors that can occur when talking to a provisioning backend
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// The base URL cannot carry a request path
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The backend refused the declaration
    #[error("Declaration rejected: {0}")]
    Rejected(String),

    /// Building or pushing a container image failed
    #[error("Image publish failed: {0}")]
    ImagePublish(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ProvisionError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let not_found = ProvisionError::api_error(404, "no such network");
        assert!(not_found.is_not_found());

        let unavailable = ProvisionError::api_error(503, "backend unavailable");
        assert!(!unavailable.is_not_found());
        assert_eq!(
            unavailable.to_string(),
            "API error (status 503): backend unavailable"
        );
    }
}
