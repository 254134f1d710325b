//! Error types for pattern deployment

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::topology::ResourceKind;

/// Which source-control step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFailure {
    CloneFailed,
    CheckoutFailed,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFailure::CloneFailed => f.write_str("clone failed"),
            SourceFailure::CheckoutFailed => f.write_str("checkout failed"),
        }
    }
}

/// Errors that end the processing of a single pattern
///
/// None of them are retried.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Staging directory already exists
    #[error("staging directory {} already exists", path.display())]
    DestinationConflict { path: PathBuf },

    /// Clone or checkout failed
    #[error("{cause} for '{reference}': {message}")]
    Source {
        cause: SourceFailure,
        /// Repository URL for clones, branch or revision for checkouts
        reference: String,
        message: String,
    },

    #[error("runtime '{0}' is not supported")]
    UnsupportedRuntime(String),

    #[error("network '{0}' could not be resolved")]
    NetworkNotFound(String),

    #[error("invalid configuration for '{name}': {reason}")]
    InvalidConfig { name: String, reason: String },

    /// The provisioning backend rejected or failed a declaration
    #[error("declaring {kind} '{logical_id}' failed: {message}")]
    Declaration {
        kind: ResourceKind,
        logical_id: String,
        message: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl DeployError {
    pub fn clone_failed(repository: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            cause: SourceFailure::CloneFailed,
            reference: repository.into(),
            message: message.into(),
        }
    }

    pub fn checkout_failed(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            cause: SourceFailure::CheckoutFailed,
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Taxonomy kind reported to the user
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DestinationConflict { .. } => ErrorKind::DestinationConflict,
            Self::Source {
                cause: SourceFailure::CloneFailed,
                ..
            } => ErrorKind::CloneFailed,
            Self::Source {
                cause: SourceFailure::CheckoutFailed,
                ..
            } => ErrorKind::CheckoutFailed,
            Self::UnsupportedRuntime(_) => ErrorKind::UnsupportedRuntime,
            Self::NetworkNotFound(_) => ErrorKind::NetworkNotFound,
            Self::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            Self::Declaration { .. } => ErrorKind::DeclarationError,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Serializable error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DestinationConflict,
    CloneFailed,
    CheckoutFailed,
    UnsupportedRuntime,
    NetworkNotFound,
    InvalidConfig,
    DeclarationError,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::DestinationConflict => "DestinationConflict",
            ErrorKind::CloneFailed => "SourceError(CloneFailed)",
            ErrorKind::CheckoutFailed => "SourceError(CheckoutFailed)",
            ErrorKind::UnsupportedRuntime => "UnsupportedRuntime",
            ErrorKind::NetworkNotFound => "NetworkNotFound",
            ErrorKind::InvalidConfig => "InvalidConfig",
            ErrorKind::DeclarationError => "DeclarationError",
            ErrorKind::Internal => "Internal",
        };
        f.write_str(label)
    }
}

/// Errors that abort a whole run before any source is fetched
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("pattern name '{0}' is used more than once")]
    DuplicateName(String),

    #[error("staging directory {} for pattern '{name}' already exists", path.display())]
    DestinationConflict { name: String, path: PathBuf },

    #[error(transparent)]
    InvalidConfig(DeployError),

    #[error("failed to prepare work root {}: {source}", path.display())]
    WorkRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while loading a pattern set
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read pattern file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pattern set: {0}")]
    Parse(#[from] serde_json::Error),
}
