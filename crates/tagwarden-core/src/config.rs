//! Policy configuration.
//!
//! Every tunable lives in an explicit struct handed to the engine at
//! construction, so tests can vary windows and channel names freely.
//! `from_env` constructors read `TAGWARDEN_*` variables on top of defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{JanitorError, Result};

/// Upper bound on any day window; keeps date arithmetic far from overflow.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Suffix appended to the marker namespace to form the reserved tag key.
pub const MARKER_KEY_SUFFIX: &str = "delete-scheduled-on";

/// Configuration for the detached volume lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JanitorConfig {
    /// Namespace prefix of the reserved marker tag
    pub marker_namespace: String,
    /// Days from "now" a freshly marked volume is kept
    pub retention_days: i64,
    /// Days before deletion during which warnings fire
    pub warning_days: i64,
    /// Channel receiving warnings and deletion confirmations
    pub channel: String,
    /// Closing line of every message
    pub sign_off: String,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            marker_namespace: "lambda:DetachedVolumeJanitor".to_string(),
            retention_days: 30,
            warning_days: 7,
            channel: "Lambda-DetachedVolumeJanitor".to_string(),
            sign_off: "-Cloud Services Team".to_string(),
        }
    }
}

impl JanitorConfig {
    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    pub fn with_warning_days(mut self, days: i64) -> Self {
        self.warning_days = days;
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_marker_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.marker_namespace = namespace.into();
        self
    }

    /// Reserved tag key holding the scheduled deletion timestamp.
    pub fn marker_key(&self) -> String {
        format!("{}:{}", self.marker_namespace, MARKER_KEY_SUFFIX)
    }

    /// Reject windows and names the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WINDOW_DAYS).contains(&self.retention_days) {
            return Err(JanitorError::Configuration(format!(
                "retention_days must be within 1..={}, got {}",
                MAX_WINDOW_DAYS, self.retention_days
            )));
        }
        if !(0..=MAX_WINDOW_DAYS).contains(&self.warning_days) {
            return Err(JanitorError::Configuration(format!(
                "warning_days must be within 0..={}, got {}",
                MAX_WINDOW_DAYS, self.warning_days
            )));
        }
        if self.marker_namespace.trim().is_empty() {
            return Err(JanitorError::Configuration(
                "marker_namespace is blank".to_string(),
            ));
        }
        if self.channel.trim().is_empty() {
            return Err(JanitorError::Configuration("channel is blank".to_string()));
        }
        Ok(())
    }

    /// Create from environment variables
    ///
    /// Reads (all optional):
    /// - TAGWARDEN_MARKER_NAMESPACE
    /// - TAGWARDEN_RETENTION_DAYS
    /// - TAGWARDEN_WARNING_DAYS
    /// - TAGWARDEN_JANITOR_CHANNEL
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(ns) = std::env::var("TAGWARDEN_MARKER_NAMESPACE") {
            config.marker_namespace = ns;
        }
        if let Some(days) = env_days("TAGWARDEN_RETENTION_DAYS")? {
            config.retention_days = days;
        }
        if let Some(days) = env_days("TAGWARDEN_WARNING_DAYS")? {
            config.warning_days = days;
        }
        if let Ok(channel) = std::env::var("TAGWARDEN_JANITOR_CHANNEL") {
            config.channel = channel;
        }
        config.validate()?;
        Ok(config)
    }
}

fn env_days(name: &str) -> Result<Option<i64>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<i64>().map(Some).map_err(|_| {
            JanitorError::Configuration(format!("{} is not an integer: {:?}", name, raw))
        }),
        Err(_) => Ok(None),
    }
}

/// Configuration for the instance tag compliance check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Channel receiving non-compliance alerts
    pub channel: String,
    /// Flat wait before the check, giving post-launch taggers time to finish
    pub pre_check_delay: Duration,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            channel: "Lambda-EC2InstanceTagCompliance".to_string(),
            pre_check_delay: Duration::from_secs(5),
        }
    }
}

impl ComplianceConfig {
    pub fn with_pre_check_delay(mut self, delay: Duration) -> Self {
        self.pre_check_delay = delay;
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}

/// Configuration for the instance DNS updater.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Target hosted zone
    pub hosted_zone_id: String,
    /// Role assumed when the zone is not visible to the local identity
    pub cross_account_role_arn: String,
    /// Hostnames must start with this prefix (case-insensitive)
    pub hostname_prefix: String,
    /// Tag carrying the instance hostname
    pub hostname_tag: String,
    /// TTL of created address records, in seconds
    pub ttl: u64,
}

impl DnsConfig {
    pub fn new(hosted_zone_id: impl Into<String>, cross_account_role_arn: impl Into<String>) -> Self {
        Self {
            hosted_zone_id: hosted_zone_id.into(),
            cross_account_role_arn: cross_account_role_arn.into(),
            hostname_prefix: "lx238".to_string(),
            hostname_tag: "Name".to_string(),
            ttl: 300,
        }
    }

    pub fn with_hostname_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.hostname_prefix = prefix.into();
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - TAGWARDEN_DNS_ZONE_ID (required)
    /// - TAGWARDEN_DNS_ROLE_ARN (required)
    /// - TAGWARDEN_DNS_HOSTNAME_PREFIX (optional, default: "lx238")
    pub fn from_env() -> Result<Self> {
        let zone = std::env::var("TAGWARDEN_DNS_ZONE_ID").map_err(|_| {
            JanitorError::Configuration("TAGWARDEN_DNS_ZONE_ID not set".to_string())
        })?;
        let role = std::env::var("TAGWARDEN_DNS_ROLE_ARN").map_err(|_| {
            JanitorError::Configuration("TAGWARDEN_DNS_ROLE_ARN not set".to_string())
        })?;
        let mut config = Self::new(zone, role);
        if let Ok(prefix) = std::env::var("TAGWARDEN_DNS_HOSTNAME_PREFIX") {
            config.hostname_prefix = prefix;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hosted_zone_id.trim().is_empty() {
            return Err(JanitorError::Configuration(
                "hosted_zone_id is blank".to_string(),
            ));
        }
        Ok(())
    }
}
