//! Error taxonomy for Tagwarden policy invocations.
//!
//! Only failures that abort an invocation surface here. Per-resource
//! gateway failures and lost notifications are recorded in the operation
//! reports instead.

use tagwarden_gateway::GatewayError;

/// Errors produced by trigger event payload validation.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("trigger event is missing required field: {field}")]
    MissingField { field: String },

    #[error("trigger event payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Invocation-level errors.
#[derive(Debug, thiserror::Error)]
pub enum JanitorError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("event error: {0}")]
    Event(#[from] EventError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("hosted zone {zone_id} not found via any credential strategy")]
    ZoneNotFound { zone_id: String },
}

/// Result type for Tagwarden policy operations.
pub type Result<T> = std::result::Result<T, JanitorError>;
