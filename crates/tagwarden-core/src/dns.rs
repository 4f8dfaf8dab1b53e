//! Address records for named instances.
//!
//! [`DnsUpdater`] keeps one type-A record per qualifying instance in a
//! single hosted zone. The zone may live in another account, so the client
//! is resolved through a [`CredentialChain`]: each strategy is tried in
//! order and the first one that can see the zone wins.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tagwarden_gateway::{
    CredentialStrategy, DnsZoneGateway, HostedZone, Instance, InstanceGateway, RecordSet,
    RecordType,
};
use tracing::{debug, info, warn, Instrument};

use crate::config::DnsConfig;
use crate::error::{JanitorError, Result};
use crate::event::TriggerEvent;
use crate::obs;

/// Ordered credential strategies behind one "resolve active client" call.
#[derive(Default)]
pub struct CredentialChain {
    strategies: Vec<Arc<dyn CredentialStrategy>>,
}

/// A client together with the zone it can see.
pub struct ResolvedZone {
    pub client: Arc<dyn DnsZoneGateway>,
    pub zone: HostedZone,
    /// Label of the strategy that resolved the zone
    pub strategy: String,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local identity first, then the assumed cross-account role.
    pub fn local_then_assumed(
        local: Arc<dyn CredentialStrategy>,
        assumed: Arc<dyn CredentialStrategy>,
    ) -> Self {
        Self::new().with_strategy(local).with_strategy(assumed)
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn CredentialStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Find the first strategy whose client lists `zone_id`.
    ///
    /// A strategy that fails to produce a client, or whose zone listing
    /// fails, is skipped. Returns `ZoneNotFound` when no strategy sees it.
    pub async fn resolve(&self, zone_id: &str) -> Result<ResolvedZone> {
        for strategy in &self.strategies {
            let client = match strategy.client().await {
                Ok(client) => client,
                Err(e) => {
                    warn!(strategy = %strategy.label(), error = %e, "credential strategy failed");
                    continue;
                }
            };
            let zones = match client.list_hosted_zones().await {
                Ok(zones) => zones,
                Err(e) => {
                    warn!(strategy = %strategy.label(), error = %e, "zone listing failed");
                    continue;
                }
            };
            match zones.into_iter().find(|z| z.id == zone_id) {
                Some(zone) => {
                    debug!(strategy = %strategy.label(), zone_id = %zone_id, "hosted zone resolved");
                    return Ok(ResolvedZone {
                        client,
                        zone,
                        strategy: strategy.label().to_string(),
                    });
                }
                None => {
                    debug!(strategy = %strategy.label(), zone_id = %zone_id, "zone not visible");
                }
            }
        }
        Err(JanitorError::ZoneNotFound {
            zone_id: zone_id.to_string(),
        })
    }
}

/// Outcome of one DNS invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DnsOutcome {
    /// The instance does not qualify; the zone was not touched
    Skipped { reason: String },
    Upserted { fqdn: String, ip: String },
    Removed { fqdn: String },
    /// Nothing to remove
    NotFound { fqdn: String },
}

/// `hostname.zoneName`
pub fn qualified_name(hostname: &str, zone: &HostedZone) -> String {
    format!("{}.{}", hostname, zone.name)
}

/// Maintains address records for instances named by the hostname tag.
pub struct DnsUpdater {
    instances: Arc<dyn InstanceGateway>,
    chain: CredentialChain,
    config: DnsConfig,
}

impl DnsUpdater {
    pub fn new(
        instances: Arc<dyn InstanceGateway>,
        chain: CredentialChain,
        config: DnsConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            instances,
            chain,
            config,
        })
    }

    pub fn config(&self) -> &DnsConfig {
        &self.config
    }

    /// Trimmed hostname if the instance qualifies, else the skip reason.
    ///
    /// Qualifies when the hostname tag is non-blank, starts with the
    /// configured prefix (ignoring case) and contains no spaces.
    pub fn qualifying_hostname(&self, instance: &Instance) -> std::result::Result<String, String> {
        let hostname = instance
            .tag(&self.config.hostname_tag)
            .map(str::trim)
            .unwrap_or_default();
        if hostname.is_empty() {
            return Err(format!(
                "the <{}> tag is not present or is empty",
                self.config.hostname_tag
            ));
        }
        let prefix = self.config.hostname_prefix.to_lowercase();
        if !hostname.to_lowercase().starts_with(&prefix) {
            return Err(format!(
                "hostname {} does not start with {}",
                hostname, self.config.hostname_prefix
            ));
        }
        if hostname.contains(' ') {
            return Err(format!("hostname {:?} contains spaces", hostname));
        }
        Ok(hostname.to_string())
    }

    /// Create or replace the instance's address record.
    pub async fn upsert_for_instance(&self, event: &TriggerEvent) -> Result<DnsOutcome> {
        event.require_region()?;
        let instance_id = event.require_instance_id()?.to_string();
        self.run_upsert(instance_id)
            .instrument(obs::invocation_span("dns_upsert", event))
            .await
    }

    /// Delete the instance's address record if one exists.
    pub async fn remove_for_instance(&self, event: &TriggerEvent) -> Result<DnsOutcome> {
        event.require_region()?;
        let instance_id = event.require_instance_id()?.to_string();
        self.run_remove(instance_id)
            .instrument(obs::invocation_span("dns_remove", event))
            .await
    }

    async fn run_upsert(&self, instance_id: String) -> Result<DnsOutcome> {
        let instance = self.instances.describe_instance(&instance_id).await?;
        let hostname = match self.qualifying_hostname(&instance) {
            Ok(hostname) => hostname,
            Err(reason) => return Ok(skipped(&instance.id, reason)),
        };
        let Some(ip) = instance.private_ip.clone().filter(|ip| !ip.trim().is_empty()) else {
            return Ok(skipped(&instance.id, "instance has no private address".to_string()));
        };

        let resolved = self.chain.resolve(&self.config.hosted_zone_id).await?;
        let fqdn = qualified_name(&hostname, &resolved.zone);
        let record = RecordSet {
            name: fqdn.clone(),
            record_type: RecordType::A,
            ttl: self.config.ttl,
            values: vec![ip.clone()],
        };
        resolved
            .client
            .upsert_record(&self.config.hosted_zone_id, &record)
            .await?;
        info!(fqdn = %fqdn, ip = %ip, strategy = %resolved.strategy, "submitted type-A record");
        obs::emit_dns_record_changed("upsert", &fqdn, &self.config.hosted_zone_id);
        Ok(DnsOutcome::Upserted { fqdn, ip })
    }

    async fn run_remove(&self, instance_id: String) -> Result<DnsOutcome> {
        let instance = self.instances.describe_instance(&instance_id).await?;
        let hostname = match self.qualifying_hostname(&instance) {
            Ok(hostname) => hostname,
            Err(reason) => return Ok(skipped(&instance.id, reason)),
        };

        let resolved = self.chain.resolve(&self.config.hosted_zone_id).await?;
        let fqdn = qualified_name(&hostname, &resolved.zone);
        let existing = resolved
            .client
            .list_record_sets(&self.config.hosted_zone_id, &fqdn, RecordType::A)
            .await?
            .into_iter()
            .find(|r| r.name == fqdn);

        let Some(record) = existing else {
            info!(
                fqdn = %fqdn,
                zone = %resolved.zone.name,
                "could not find DNS record; no record removed"
            );
            return Ok(DnsOutcome::NotFound { fqdn });
        };
        resolved
            .client
            .delete_record(&self.config.hosted_zone_id, &record)
            .await?;
        obs::emit_dns_record_changed("delete", &fqdn, &self.config.hosted_zone_id);
        Ok(DnsOutcome::Removed { fqdn })
    }
}

fn skipped(instance_id: &str, reason: String) -> DnsOutcome {
    debug!(instance_id = %instance_id, reason = %reason, "instance does not qualify for DNS");
    DnsOutcome::Skipped { reason }
}
