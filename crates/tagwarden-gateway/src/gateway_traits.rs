//! Gateway trait definitions for Tagwarden
//!
//! These traits define the external collaborators the policy engines drive:
//! - `ResourceGateway`: detached storage volumes (list, tag, untag, delete)
//! - `InstanceGateway`: compute instance lookup
//! - `NotificationGateway`: topic-style pub/sub of text messages
//! - `DnsZoneGateway` + `CredentialStrategy`: hosted-zone record management
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Result type for gateway operations
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

// ---------------------------------------------------------------------------
// Tags and resources
// ---------------------------------------------------------------------------

/// A single key/value metadata entry on a cloud resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}: {}}}", self.key, self.value)
    }
}

/// Look up a tag value by exact key.
pub fn find_tag<'a>(tags: &'a [Tag], key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|t| t.key == key)
        .map(|t| t.value.as_str())
}

/// Insert or overwrite a tag, keeping keys unique.
pub fn upsert_tag(tags: &mut Vec<Tag>, tag: Tag) {
    match tags.iter_mut().find(|t| t.key == tag.key) {
        Some(existing) => existing.value = tag.value,
        None => tags.push(tag),
    }
}

/// A storage volume as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Opaque control-plane identifier (e.g. `vol-0abc...`)
    pub id: String,
    /// Metadata entries; keys are unique per resource
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Resource {
    pub fn new(id: impl Into<String>, tags: Vec<Tag>) -> Self {
        Self {
            id: id.into(),
            tags,
        }
    }

    /// Value of the tag with `key`, if present.
    pub fn tag(&self, key: &str) -> Option<&str> {
        find_tag(&self.tags, key)
    }
}

/// A compute instance as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    /// Private IPv4 address, if the instance has one yet
    #[serde(default)]
    pub private_ip: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Instance {
    pub fn tag(&self, key: &str) -> Option<&str> {
        find_tag(&self.tags, key)
    }
}

/// Storage volumes in the "available" (unattached) state.
///
/// Guarantees:
/// - `list_detached` reflects live control-plane state on every call.
/// - `set_tag` overwrites any existing value for the same key.
/// - `remove_tag` is a no-op when the key is absent.
/// - `delete` is fire-and-forget: success means the request was accepted,
///   not that the volume is already gone.
#[async_trait]
pub trait ResourceGateway: Send + Sync {
    /// List every volume currently not attached to an instance.
    async fn list_detached(&self) -> GatewayResult<Vec<Resource>>;

    /// Apply (or overwrite) a tag on a resource.
    async fn set_tag(&self, resource_id: &str, tag: &Tag) -> GatewayResult<()>;

    /// Remove the tag with `key` from a resource.
    async fn remove_tag(&self, resource_id: &str, key: &str) -> GatewayResult<()>;

    /// Submit deletion of a resource.
    async fn delete(&self, resource_id: &str) -> GatewayResult<()>;
}

/// Compute instance lookup.
#[async_trait]
pub trait InstanceGateway: Send + Sync {
    /// Describe a single instance. Returns `GatewayError::NotFound` if absent.
    async fn describe_instance(&self, instance_id: &str) -> GatewayResult<Instance>;
}

// ---------------------------------------------------------------------------
// NotificationGateway
// ---------------------------------------------------------------------------

/// Handle to a resolved notification channel (topic).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelHandle {
    /// Channel name as requested
    pub name: String,
    /// Backend address of the channel (topic ARN, directory path, ...)
    pub address: String,
}

/// Topic-based text notifications.
///
/// Guarantees:
/// - `ensure_channel` creates the channel when absent and is idempotent.
/// - `publish` delivers at most once; no retries are implied.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn ensure_channel(&self, name: &str) -> GatewayResult<ChannelHandle>;

    async fn publish(&self, channel: &ChannelHandle, subject: &str, body: &str)
        -> GatewayResult<()>;
}

// ---------------------------------------------------------------------------
// DNS
// ---------------------------------------------------------------------------

/// A hosted DNS zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZone {
    pub id: String,
    /// Zone apex, e.g. `corp.example.com.`
    pub name: String,
}

/// DNS record type. Only address records are managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    A,
}

/// A named record set inside a hosted zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    pub name: String,
    pub record_type: RecordType,
    pub ttl: u64,
    pub values: Vec<String>,
}

/// Hosted-zone record management for one set of credentials.
#[async_trait]
pub trait DnsZoneGateway: Send + Sync {
    /// Zones visible to the current credentials.
    async fn list_hosted_zones(&self) -> GatewayResult<Vec<HostedZone>>;

    /// Create or replace a record set.
    async fn upsert_record(&self, zone_id: &str, record: &RecordSet) -> GatewayResult<()>;

    /// Record sets of `record_type` starting at `start_name` in lexical order.
    async fn list_record_sets(
        &self,
        zone_id: &str,
        start_name: &str,
        record_type: RecordType,
    ) -> GatewayResult<Vec<RecordSet>>;

    /// Delete an existing record set (must match exactly).
    async fn delete_record(&self, zone_id: &str, record: &RecordSet) -> GatewayResult<()>;
}

/// One way of obtaining a DNS client (local identity, assumed role, ...).
#[async_trait]
pub trait CredentialStrategy: Send + Sync {
    /// Short label used in logs.
    fn label(&self) -> &str;

    /// Build a client authenticated with this strategy's credentials.
    async fn client(&self) -> GatewayResult<Arc<dyn DnsZoneGateway>>;
}
