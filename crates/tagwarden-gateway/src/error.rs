//! Error types for tagwarden-gateway

use thiserror::Error;

/// Errors raised by control-plane, notification and DNS gateways.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The addressed resource does not exist (or is already gone).
    #[error("resource not found: {resource_id}")]
    NotFound { resource_id: String },

    /// The control plane refused the request.
    #[error("{operation} rejected for {resource_id}: {reason}")]
    Rejected {
        operation: String,
        resource_id: String,
        reason: String,
    },

    /// A notification channel could not be created or published to.
    #[error("channel {channel} unavailable: {reason}")]
    ChannelUnavailable { channel: String, reason: String },

    /// Credentials could not be resolved for a DNS client.
    #[error("credential strategy {strategy} failed: {reason}")]
    Credentials { strategy: String, reason: String },

    /// The backing service could not be reached.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// IO error (file-backed adapters)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error (file-backed adapters)
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// Shorthand for a control-plane rejection.
    pub fn rejected(
        operation: impl Into<String>,
        resource_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        GatewayError::Rejected {
            operation: operation.into(),
            resource_id: resource_id.into(),
            reason: reason.into(),
        }
    }
}
