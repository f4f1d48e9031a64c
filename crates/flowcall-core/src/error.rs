//! Error types for the flowcall engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire flowcall workspace.
///
/// Every variant renders as a short sentence that can be spoken back to the
/// caller as-is, so messages never carry stack traces or internal ids.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum FlowcallError {
    /// A function call carried parameters the handler cannot use
    #[error("{0}")]
    InvalidParameters(String),

    /// The workflow generator failed or returned an unusable graph
    #[error("Workflow generation failed: {0}")]
    Generation(String),

    /// The deployment client rejected or failed the deployment
    #[error("Deployment failed: {0}")]
    Deployment(String),

    /// The session vanished mid-call, e.g. evicted after going idle
    #[error("This conversation expired. Let's start again.")]
    SessionExpired,

    /// The node catalog could not be searched
    #[error("Node search failed: {0}")]
    Catalog(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlowcallError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an InvalidParameters error
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters(message.into())
    }

    /// Creates a Generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Creates a Deployment error
    pub fn deployment(message: impl Into<String>) -> Self {
        Self::Deployment(message.into())
    }

    /// Creates a Catalog error
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this error came from a collaborator rather than the caller
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::Generation(_) | Self::Deployment(_) | Self::Catalog(_)
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<serde_json::Error> for FlowcallError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for FlowcallError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for FlowcallError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for FlowcallError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<anyhow::Error> for FlowcallError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<String> for FlowcallError {
    fn from(err: String) -> Self {
        Self::Internal(err)
    }
}

/// A type alias for `Result<T, FlowcallError>`.
pub type Result<T> = std::result::Result<T, FlowcallError>;
