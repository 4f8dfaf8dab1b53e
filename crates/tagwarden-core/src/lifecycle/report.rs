//! Outcomes of lifecycle entry operations.
//!
//! Reports are the record of partial failure: a gateway call that fails for
//! one volume lands in `failures` while the rest of the batch proceeds.

use serde::{Deserialize, Serialize};

use super::state::LifecycleState;

/// Which per-resource gateway call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayAction {
    SetMarker,
    RemoveMarker,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFailure {
    pub resource_id: String,
    pub action: GatewayAction,
    pub error: String,
}

/// What happened to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishOutcome {
    /// Nothing to report; the gateway was not called
    Skipped,
    Published { channel: String },
    Failed { error: String },
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkReport {
    pub scanned: usize,
    /// Volumes that received a new marker
    pub marked: Vec<String>,
    /// Volumes left alone because a valid marker already exists
    pub already_scheduled: usize,
    pub failures: Vec<ResourceFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub scanned: usize,
    /// Volumes listed in the warning message
    pub warned: Vec<String>,
    pub warning: PublishOutcome,
    /// Volumes whose deletion request was accepted
    pub deleted: Vec<String>,
    pub confirmation: PublishOutcome,
    pub failures: Vec<ResourceFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearReport {
    pub scanned: usize,
    pub cleared: Vec<String>,
    pub failures: Vec<ResourceFailure>,
}

/// Read-only view of one volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeStatus {
    pub resource_id: String,
    #[serde(flatten)]
    pub state: LifecycleState,
    /// Raw marker text when present but unparseable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub malformed_marker: Option<String>,
}
