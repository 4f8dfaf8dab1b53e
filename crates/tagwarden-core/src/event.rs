//! Trigger event payloads delivered by the scheduler.
//!
//! Scheduled invocations carry `{id, region, account}`; instance state-change
//! invocations additionally carry `detail["instance-id"]`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EventError, JanitorError, Result};

/// Detail key holding the instance id on state-change events.
pub const INSTANCE_ID_KEY: &str = "instance-id";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub detail: BTreeMap<String, Value>,
}

impl TriggerEvent {
    pub fn scheduled(region: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account: account.into(),
            ..Default::default()
        }
    }

    /// Builder: attach an instance id as a state-change event would.
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.detail
            .insert(INSTANCE_ID_KEY.to_string(), Value::String(instance_id.into()));
        self
    }

    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| JanitorError::Event(EventError::Malformed(e)))
    }

    /// Instance id from the event detail, if present and a non-blank string.
    pub fn instance_id(&self) -> Option<&str> {
        self.detail
            .get(INSTANCE_ID_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Region is mandatory for every invocation.
    pub fn require_region(&self) -> Result<&str> {
        let region = self.region.trim();
        if region.is_empty() {
            return Err(JanitorError::Configuration(
                "region is blank, cannot create control-plane client".to_string(),
            ));
        }
        Ok(region)
    }

    pub fn require_instance_id(&self) -> Result<&str> {
        self.instance_id().ok_or_else(|| {
            EventError::MissingField {
                field: format!("detail.{}", INSTANCE_ID_KEY),
            }
            .into()
        })
    }
}
