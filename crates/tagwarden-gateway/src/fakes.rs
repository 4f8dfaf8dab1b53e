//! In-memory fakes for gateway traits (testing only)
//!
//! Provides `MemoryResourceGateway`, `MemoryNotifier`, `MemoryDnsZone` and
//! credential strategies that satisfy the trait contracts without any
//! external dependencies. Each fake can be told to fail specific calls so
//! partial-failure behaviour can be exercised.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::gateway_traits::*;

// ---------------------------------------------------------------------------
// MemoryResourceGateway
// ---------------------------------------------------------------------------

/// A call observed by [`MemoryResourceGateway`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    ListDetached,
    SetTag {
        resource_id: String,
        key: String,
        value: String,
    },
    RemoveTag {
        resource_id: String,
        key: String,
    },
    Delete {
        resource_id: String,
    },
    DescribeInstance {
        instance_id: String,
    },
}

impl GatewayCall {
    /// True for calls that mutate control-plane state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            GatewayCall::SetTag { .. } | GatewayCall::RemoveTag { .. } | GatewayCall::Delete { .. }
        )
    }
}

/// Operations that can be forced to fail for a given resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOn {
    SetTag,
    RemoveTag,
    Delete,
}

#[derive(Debug, Clone)]
struct VolumeEntry {
    resource: Resource,
    attached: bool,
}

/// In-memory control plane holding volumes (in insertion order) and instances.
#[derive(Debug, Default)]
pub struct MemoryResourceGateway {
    volumes: Mutex<Vec<VolumeEntry>>,
    instances: Mutex<HashMap<String, Instance>>,
    failures: Mutex<HashSet<(FailOn, String)>>,
    list_failure: Mutex<Option<String>>,
    calls: Mutex<Vec<GatewayCall>>,
}

impl MemoryResourceGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a detached volume.
    pub fn with_volume(self, resource: Resource) -> Self {
        self.add_volume(resource);
        self
    }

    /// Builder: add an instance.
    pub fn with_instance(self, instance: Instance) -> Self {
        self.add_instance(instance);
        self
    }

    pub fn add_volume(&self, resource: Resource) {
        self.volumes.lock().unwrap().push(VolumeEntry {
            resource,
            attached: false,
        });
    }

    /// Add a volume that is attached and therefore never listed as detached.
    pub fn add_attached_volume(&self, resource: Resource) {
        self.volumes.lock().unwrap().push(VolumeEntry {
            resource,
            attached: true,
        });
    }

    pub fn add_instance(&self, instance: Instance) {
        self.instances
            .lock()
            .unwrap()
            .insert(instance.id.clone(), instance);
    }

    /// Force `op` to fail for `resource_id` until cleared.
    pub fn fail_on(&self, op: FailOn, resource_id: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert((op, resource_id.to_string()));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Make `list_detached` fail with `reason`.
    pub fn fail_listing(&self, reason: &str) {
        *self.list_failure.lock().unwrap() = Some(reason.to_string());
    }

    /// Current state of a volume, attached or not.
    pub fn volume(&self, resource_id: &str) -> Option<Resource> {
        self.volumes
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.resource.id == resource_id)
            .map(|v| v.resource.clone())
    }

    /// Overwrite a tag directly, bypassing the call log (simulates an operator).
    pub fn operator_set_tag(&self, resource_id: &str, tag: Tag) {
        let mut volumes = self.volumes.lock().unwrap();
        if let Some(v) = volumes.iter_mut().find(|v| v.resource.id == resource_id) {
            upsert_tag(&mut v.resource.tags, tag);
        }
    }

    pub fn volume_ids(&self) -> Vec<String> {
        self.volumes
            .lock()
            .unwrap()
            .iter()
            .map(|v| v.resource.id.clone())
            .collect()
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Only the mutating calls received so far.
    pub fn write_calls(&self) -> Vec<GatewayCall> {
        self.calls().into_iter().filter(|c| c.is_write()).collect()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_failure(&self, op: FailOn, resource_id: &str) -> GatewayResult<()> {
        if self
            .failures
            .lock()
            .unwrap()
            .contains(&(op, resource_id.to_string()))
        {
            return Err(GatewayError::rejected(
                format!("{:?}", op),
                resource_id,
                "injected failure",
            ));
        }
        Ok(())
    }

    fn with_volume_mut<T>(
        &self,
        resource_id: &str,
        f: impl FnOnce(&mut VolumeEntry) -> T,
    ) -> GatewayResult<T> {
        let mut volumes = self.volumes.lock().unwrap();
        volumes
            .iter_mut()
            .find(|v| v.resource.id == resource_id)
            .map(f)
            .ok_or_else(|| GatewayError::NotFound {
                resource_id: resource_id.to_string(),
            })
    }
}

#[async_trait]
impl ResourceGateway for MemoryResourceGateway {
    async fn list_detached(&self) -> GatewayResult<Vec<Resource>> {
        self.record(GatewayCall::ListDetached);
        if let Some(reason) = self.list_failure.lock().unwrap().clone() {
            return Err(GatewayError::Unavailable(reason));
        }
        Ok(self
            .volumes
            .lock()
            .unwrap()
            .iter()
            .filter(|v| !v.attached)
            .map(|v| v.resource.clone())
            .collect())
    }

    async fn set_tag(&self, resource_id: &str, tag: &Tag) -> GatewayResult<()> {
        self.record(GatewayCall::SetTag {
            resource_id: resource_id.to_string(),
            key: tag.key.clone(),
            value: tag.value.clone(),
        });
        self.check_failure(FailOn::SetTag, resource_id)?;
        self.with_volume_mut(resource_id, |v| {
            upsert_tag(&mut v.resource.tags, tag.clone())
        })
    }

    async fn remove_tag(&self, resource_id: &str, key: &str) -> GatewayResult<()> {
        self.record(GatewayCall::RemoveTag {
            resource_id: resource_id.to_string(),
            key: key.to_string(),
        });
        self.check_failure(FailOn::RemoveTag, resource_id)?;
        self.with_volume_mut(resource_id, |v| v.resource.tags.retain(|t| t.key != key))
    }

    async fn delete(&self, resource_id: &str) -> GatewayResult<()> {
        self.record(GatewayCall::Delete {
            resource_id: resource_id.to_string(),
        });
        self.check_failure(FailOn::Delete, resource_id)?;
        let mut volumes = self.volumes.lock().unwrap();
        let pos = volumes
            .iter()
            .position(|v| v.resource.id == resource_id)
            .ok_or_else(|| GatewayError::NotFound {
                resource_id: resource_id.to_string(),
            })?;
        if volumes[pos].attached {
            return Err(GatewayError::rejected(
                "delete",
                resource_id,
                "volume is in use",
            ));
        }
        volumes.remove(pos);
        Ok(())
    }
}

#[async_trait]
impl InstanceGateway for MemoryResourceGateway {
    async fn describe_instance(&self, instance_id: &str) -> GatewayResult<Instance> {
        self.record(GatewayCall::DescribeInstance {
            instance_id: instance_id.to_string(),
        });
        self.instances
            .lock()
            .unwrap()
            .get(instance_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                resource_id: instance_id.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// MemoryNotifier
// ---------------------------------------------------------------------------

/// A message captured by [`MemoryNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub channel: String,
    pub subject: String,
    pub body: String,
}

/// In-memory notifier recording every published message.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    channels: Mutex<BTreeSet<String>>,
    published: Mutex<Vec<PublishedMessage>>,
    fail_publish: Mutex<Option<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `publish` fail with `reason`.
    pub fn fail_publish(&self, reason: &str) {
        *self.fail_publish.lock().unwrap() = Some(reason.to_string());
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    /// Channels created so far, sorted by name.
    pub fn channels(&self) -> Vec<String> {
        self.channels.lock().unwrap().iter().cloned().collect()
    }
}

#[async_trait]
impl NotificationGateway for MemoryNotifier {
    async fn ensure_channel(&self, name: &str) -> GatewayResult<ChannelHandle> {
        self.channels.lock().unwrap().insert(name.to_string());
        Ok(ChannelHandle {
            name: name.to_string(),
            address: format!("memory://{}", name),
        })
    }

    async fn publish(
        &self,
        channel: &ChannelHandle,
        subject: &str,
        body: &str,
    ) -> GatewayResult<()> {
        if let Some(reason) = self.fail_publish.lock().unwrap().clone() {
            return Err(GatewayError::ChannelUnavailable {
                channel: channel.name.clone(),
                reason,
            });
        }
        if !self.channels.lock().unwrap().contains(&channel.name) {
            return Err(GatewayError::ChannelUnavailable {
                channel: channel.name.clone(),
                reason: "channel does not exist".to_string(),
            });
        }
        self.published.lock().unwrap().push(PublishedMessage {
            channel: channel.name.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryDnsZone
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ZoneEntry {
    zone: HostedZone,
    records: Vec<RecordSet>,
}

/// In-memory DNS control plane for one set of credentials.
#[derive(Debug, Default)]
pub struct MemoryDnsZone {
    zones: Mutex<Vec<ZoneEntry>>,
}

impl MemoryDnsZone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(self, id: &str, name: &str) -> Self {
        self.zones.lock().unwrap().push(ZoneEntry {
            zone: HostedZone {
                id: id.to_string(),
                name: name.to_string(),
            },
            records: Vec::new(),
        });
        self
    }

    /// All record sets in a zone (empty if the zone is unknown).
    pub fn records(&self, zone_id: &str) -> Vec<RecordSet> {
        self.zones
            .lock()
            .unwrap()
            .iter()
            .find(|z| z.zone.id == zone_id)
            .map(|z| z.records.clone())
            .unwrap_or_default()
    }

    fn with_zone_mut<T>(
        &self,
        zone_id: &str,
        f: impl FnOnce(&mut ZoneEntry) -> GatewayResult<T>,
    ) -> GatewayResult<T> {
        let mut zones = self.zones.lock().unwrap();
        let entry = zones
            .iter_mut()
            .find(|z| z.zone.id == zone_id)
            .ok_or_else(|| GatewayError::NotFound {
                resource_id: zone_id.to_string(),
            })?;
        f(entry)
    }
}

#[async_trait]
impl DnsZoneGateway for MemoryDnsZone {
    async fn list_hosted_zones(&self) -> GatewayResult<Vec<HostedZone>> {
        Ok(self
            .zones
            .lock()
            .unwrap()
            .iter()
            .map(|z| z.zone.clone())
            .collect())
    }

    async fn upsert_record(&self, zone_id: &str, record: &RecordSet) -> GatewayResult<()> {
        self.with_zone_mut(zone_id, |entry| {
            entry
                .records
                .retain(|r| !(r.name == record.name && r.record_type == record.record_type));
            entry.records.push(record.clone());
            Ok(())
        })
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        start_name: &str,
        record_type: RecordType,
    ) -> GatewayResult<Vec<RecordSet>> {
        self.with_zone_mut(zone_id, |entry| {
            let mut found: Vec<RecordSet> = entry
                .records
                .iter()
                .filter(|r| r.record_type == record_type && r.name.as_str() >= start_name)
                .cloned()
                .collect();
            found.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(found)
        })
    }

    async fn delete_record(&self, zone_id: &str, record: &RecordSet) -> GatewayResult<()> {
        self.with_zone_mut(zone_id, |entry| {
            let before = entry.records.len();
            entry.records.retain(|r| r != record);
            if entry.records.len() == before {
                return Err(GatewayError::rejected(
                    "delete_record",
                    record.name.clone(),
                    "record set does not match",
                ));
            }
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Credential strategies
// ---------------------------------------------------------------------------

/// Strategy that always yields a pre-built client.
pub struct StaticCredential {
    label: String,
    client: Arc<dyn DnsZoneGateway>,
}

impl StaticCredential {
    pub fn new(label: &str, client: Arc<dyn DnsZoneGateway>) -> Self {
        Self {
            label: label.to_string(),
            client,
        }
    }
}

#[async_trait]
impl CredentialStrategy for StaticCredential {
    fn label(&self) -> &str {
        &self.label
    }

    async fn client(&self) -> GatewayResult<Arc<dyn DnsZoneGateway>> {
        Ok(Arc::clone(&self.client))
    }
}

/// Strategy whose credentials can never be resolved.
pub struct FailingCredential {
    label: String,
    reason: String,
}

impl FailingCredential {
    pub fn new(label: &str, reason: &str) -> Self {
        Self {
            label: label.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl CredentialStrategy for FailingCredential {
    fn label(&self) -> &str {
        &self.label
    }

    async fn client(&self) -> GatewayResult<Arc<dyn DnsZoneGateway>> {
        Err(GatewayError::Credentials {
            strategy: self.label.clone(),
            reason: self.reason.clone(),
        })
    }
}
