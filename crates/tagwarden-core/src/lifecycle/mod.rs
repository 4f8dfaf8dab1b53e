//! Detached volume lifecycle.
//!
//! Lifecycle state lives entirely in one tag per volume; every module here
//! re-derives it from a fresh snapshot on each invocation.

pub mod janitor;
pub mod message;
pub mod report;
pub mod state;

pub use janitor::VolumeJanitor;
pub use message::{compose_confirmation, compose_warning, deliver, Notification};
pub use report::{
    ClearReport, GatewayAction, MarkReport, PublishOutcome, ResourceFailure, SweepReport,
    VolumeStatus,
};
pub use state::{
    classify, in_warning_window, is_past_due, lifecycle_state, partition, read_marker,
    LifecycleState, Selection,
};
