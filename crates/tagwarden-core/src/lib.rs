//! Tagwarden Core: policy engines for cloud resource hygiene
//!
//! ## Key Components
//!
//! - `lifecycle`: tag-encoded deletion lifecycle for detached volumes
//!   (`VolumeJanitor`: mark, notify-and-delete, clear, inspect)
//! - `compliance`: required-tag evaluation for launched instances
//! - `dns`: address records for named instances, with a credential chain
//! - `codec`: marker timestamp format and day arithmetic
//! - `event`: trigger event payloads
//! - `config`: configuration defaults and environment overrides
//! - `obs` / `telemetry`: structured events and subscriber setup
//!
//! All lifecycle state lives in resource tags. Nothing is cached between
//! invocations.

pub mod codec;
pub mod compliance;
pub mod config;
pub mod dns;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod obs;
pub mod telemetry;

pub use compliance::{
    compose_alert, evaluate_tags, ComplianceReport, TagComplianceChecker, TagRule, TagRuleSet,
    TagVerdict, TagViolation,
};
pub use config::{ComplianceConfig, DnsConfig, JanitorConfig};
pub use dns::{qualified_name, CredentialChain, DnsOutcome, DnsUpdater, ResolvedZone};
pub use error::{EventError, JanitorError, Result};
pub use event::TriggerEvent;
pub use lifecycle::{
    ClearReport, LifecycleState, MarkReport, PublishOutcome, SweepReport, VolumeJanitor,
    VolumeStatus,
};
pub use telemetry::init_tracing;

/// Tagwarden version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
