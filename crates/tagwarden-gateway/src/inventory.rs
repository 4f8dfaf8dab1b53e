//! File-backed control plane
//!
//! `FileInventory` keeps volumes, instances and hosted zones in one JSON
//! document so the policy engines can be driven locally. Every mutation is a
//! read-modify-write of the whole document, persisted atomically via a temp
//! file in the same directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::GatewayError;
use crate::gateway_traits::*;

/// Principal name that owns zones visible to the local identity.
pub const LOCAL_PRINCIPAL: &str = "local";

/// A volume as stored in the inventory document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub id: String,
    /// Instance the volume is attached to; `None` means detached
    #[serde(default)]
    pub attached_to: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// A hosted zone as stored in the inventory document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub id: String,
    pub name: String,
    /// Which principal can see this zone (`local` or a role ARN)
    #[serde(default = "default_principal")]
    pub principal: String,
    #[serde(default)]
    pub records: Vec<RecordSet>,
}

fn default_principal() -> String {
    LOCAL_PRINCIPAL.to_string()
}

/// Whole inventory document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDocument {
    #[serde(default)]
    pub volumes: Vec<VolumeRecord>,
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub zones: Vec<ZoneRecord>,
}

/// JSON-file control plane implementing [`ResourceGateway`] and [`InstanceGateway`].
#[derive(Debug)]
pub struct FileInventory {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileInventory {
    /// Open an existing inventory document, validating that it parses.
    pub fn open(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let inventory = Self {
            path: path.as_ref().to_path_buf(),
            guard: Mutex::new(()),
        };
        inventory.load()?;
        Ok(inventory)
    }

    /// Create (or overwrite) an inventory document.
    pub fn create(path: impl AsRef<Path>, document: &InventoryDocument) -> GatewayResult<Self> {
        let inventory = Self {
            path: path.as_ref().to_path_buf(),
            guard: Mutex::new(()),
        };
        inventory.store(document)?;
        Ok(inventory)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current document.
    pub fn load(&self) -> GatewayResult<InventoryDocument> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn store(&self, document: &InventoryDocument) -> GatewayResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let content = serde_json::to_vec_pretty(document)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&content)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn update<T>(
        &self,
        f: impl FnOnce(&mut InventoryDocument) -> GatewayResult<T>,
    ) -> GatewayResult<T> {
        let _held = self
            .guard
            .lock()
            .map_err(|_| GatewayError::Unavailable("inventory lock poisoned".to_string()))?;
        let mut document = self.load()?;
        let out = f(&mut document)?;
        self.store(&document)?;
        Ok(out)
    }

    fn update_volume(
        &self,
        resource_id: &str,
        f: impl FnOnce(&mut VolumeRecord),
    ) -> GatewayResult<()> {
        self.update(|doc| {
            let volume = doc
                .volumes
                .iter_mut()
                .find(|v| v.id == resource_id)
                .ok_or_else(|| GatewayError::NotFound {
                    resource_id: resource_id.to_string(),
                })?;
            f(volume);
            Ok(())
        })
    }

    /// DNS view restricted to zones owned by `principal`.
    pub fn dns_view(self: &Arc<Self>, principal: &str) -> FileDnsView {
        FileDnsView {
            inventory: Arc::clone(self),
            principal: principal.to_string(),
        }
    }

    /// Credential strategy that resolves to the DNS view of `principal`.
    pub fn credential(self: &Arc<Self>, label: &str, principal: &str) -> InventoryCredential {
        InventoryCredential {
            label: label.to_string(),
            inventory: Arc::clone(self),
            principal: principal.to_string(),
        }
    }
}

#[async_trait]
impl ResourceGateway for FileInventory {
    async fn list_detached(&self) -> GatewayResult<Vec<Resource>> {
        let document = self.load()?;
        Ok(document
            .volumes
            .into_iter()
            .filter(|v| v.attached_to.is_none())
            .map(|v| Resource::new(v.id, v.tags))
            .collect())
    }

    async fn set_tag(&self, resource_id: &str, tag: &Tag) -> GatewayResult<()> {
        debug!(resource_id = %resource_id, key = %tag.key, "inventory set_tag");
        self.update_volume(resource_id, |v| upsert_tag(&mut v.tags, tag.clone()))
    }

    async fn remove_tag(&self, resource_id: &str, key: &str) -> GatewayResult<()> {
        debug!(resource_id = %resource_id, key = %key, "inventory remove_tag");
        self.update_volume(resource_id, |v| v.tags.retain(|t| t.key != key))
    }

    async fn delete(&self, resource_id: &str) -> GatewayResult<()> {
        debug!(resource_id = %resource_id, "inventory delete");
        self.update(|doc| {
            let pos = doc
                .volumes
                .iter()
                .position(|v| v.id == resource_id)
                .ok_or_else(|| GatewayError::NotFound {
                    resource_id: resource_id.to_string(),
                })?;
            if let Some(instance) = &doc.volumes[pos].attached_to {
                return Err(GatewayError::rejected(
                    "delete",
                    resource_id,
                    format!("volume is attached to {}", instance),
                ));
            }
            doc.volumes.remove(pos);
            Ok(())
        })
    }
}

#[async_trait]
impl InstanceGateway for FileInventory {
    async fn describe_instance(&self, instance_id: &str) -> GatewayResult<Instance> {
        self.load()?
            .instances
            .into_iter()
            .find(|i| i.id == instance_id)
            .ok_or_else(|| GatewayError::NotFound {
                resource_id: instance_id.to_string(),
            })
    }
}

/// [`DnsZoneGateway`] over the zones of one principal in a [`FileInventory`].
#[derive(Debug, Clone)]
pub struct FileDnsView {
    inventory: Arc<FileInventory>,
    principal: String,
}

impl FileDnsView {
    fn update_zone<T>(
        &self,
        zone_id: &str,
        f: impl FnOnce(&mut ZoneRecord) -> GatewayResult<T>,
    ) -> GatewayResult<T> {
        let principal = self.principal.clone();
        self.inventory.update(|doc| {
            let zone = doc
                .zones
                .iter_mut()
                .find(|z| z.id == zone_id && z.principal == principal)
                .ok_or_else(|| GatewayError::NotFound {
                    resource_id: zone_id.to_string(),
                })?;
            f(zone)
        })
    }
}

#[async_trait]
impl DnsZoneGateway for FileDnsView {
    async fn list_hosted_zones(&self) -> GatewayResult<Vec<HostedZone>> {
        Ok(self
            .inventory
            .load()?
            .zones
            .into_iter()
            .filter(|z| z.principal == self.principal)
            .map(|z| HostedZone {
                id: z.id,
                name: z.name,
            })
            .collect())
    }

    async fn upsert_record(&self, zone_id: &str, record: &RecordSet) -> GatewayResult<()> {
        self.update_zone(zone_id, |zone| {
            zone.records
                .retain(|r| !(r.name == record.name && r.record_type == record.record_type));
            zone.records.push(record.clone());
            Ok(())
        })
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        start_name: &str,
        record_type: RecordType,
    ) -> GatewayResult<Vec<RecordSet>> {
        let zone = self
            .inventory
            .load()?
            .zones
            .into_iter()
            .find(|z| z.id == zone_id && z.principal == self.principal)
            .ok_or_else(|| GatewayError::NotFound {
                resource_id: zone_id.to_string(),
            })?;
        let mut found: Vec<RecordSet> = zone
            .records
            .into_iter()
            .filter(|r| r.record_type == record_type && r.name.as_str() >= start_name)
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn delete_record(&self, zone_id: &str, record: &RecordSet) -> GatewayResult<()> {
        self.update_zone(zone_id, |zone| {
            let before = zone.records.len();
            zone.records.retain(|r| r != record);
            if zone.records.len() == before {
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

/// Acts as one inventory principal (`local` or a role ARN).
///
/// Fails with `Credentials` when the principal owns no zone at all, the
/// way an unassumable role fails before any zone can be listed.
#[derive(Debug, Clone)]
pub struct InventoryCredential {
    label: String,
    inventory: Arc<FileInventory>,
    principal: String,
}

#[async_trait]
impl CredentialStrategy for InventoryCredential {
    fn label(&self) -> &str {
        &self.label
    }

    async fn client(&self) -> GatewayResult<Arc<dyn DnsZoneGateway>> {
        let known = self
            .inventory
            .load()?
            .zones
            .iter()
            .any(|z| z.principal == self.principal);
        if !known {
            return Err(GatewayError::Credentials {
                strategy: self.label.clone(),
                reason: format!("principal {} is not known to the inventory", self.principal),
            });
        }
        debug!(strategy = %self.label, principal = %self.principal, "inventory credential resolved");
        Ok(Arc::new(self.inventory.dns_view(&self.principal)))
    }
}
