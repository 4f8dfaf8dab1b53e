use std::sync::Arc;

use chrono::{DateTime, Utc};
use tagwarden_gateway::{find_tag, NotificationGateway, Resource, ResourceGateway, Tag};
use tracing::{debug, Instrument};

use super::message::{compose_confirmation, compose_warning, deliver, Notification};
use super::report::{
    ClearReport, GatewayAction, MarkReport, PublishOutcome, ResourceFailure, SweepReport,
    VolumeStatus,
};
use super::state::{lifecycle_state, partition};
use crate::codec::{add_days, format_marker, parse_marker};
use crate::config::JanitorConfig;
use crate::error::Result;
use crate::event::TriggerEvent;
use crate::obs;

/// Detached volume lifecycle engine.
///
/// Holds no lifecycle state of its own. Each entry operation lists the
/// detached volumes afresh, derives every volume's state from its marker
/// tag, applies the transitions and returns a report. Re-running any
/// operation is safe: state is re-derived, never cached.
pub struct VolumeJanitor {
    resources: Arc<dyn ResourceGateway>,
    notifier: Arc<dyn NotificationGateway>,
    config: JanitorConfig,
    marker_key: String,
}

impl VolumeJanitor {
    pub fn new(
        resources: Arc<dyn ResourceGateway>,
        notifier: Arc<dyn NotificationGateway>,
        config: JanitorConfig,
    ) -> Result<Self> {
        config.validate()?;
        let marker_key = config.marker_key();
        Ok(Self {
            resources,
            notifier,
            config,
            marker_key,
        })
    }

    pub fn config(&self) -> &JanitorConfig {
        &self.config
    }

    pub fn marker_key(&self) -> &str {
        &self.marker_key
    }

    // -----------------------------------------------------------------------
    // Entry operations
    // -----------------------------------------------------------------------

    /// Schedule every unmarked detached volume for deletion in
    /// `retention_days`. Volumes with a valid marker are never touched.
    pub async fn mark(&self, event: &TriggerEvent, now: DateTime<Utc>) -> Result<MarkReport> {
        event.require_region()?;
        self.run_mark(now)
            .instrument(obs::invocation_span("mark", event))
            .await
    }

    /// Warn about volumes inside the warning window, then delete volumes
    /// past their marker. Both phases share one listing.
    pub async fn notify_and_delete(
        &self,
        event: &TriggerEvent,
        now: DateTime<Utc>,
    ) -> Result<SweepReport> {
        event.require_region()?;
        self.run_sweep(event, now)
            .instrument(obs::invocation_span("notify_and_delete", event))
            .await
    }

    /// Remove the marker from every detached volume, whatever its state.
    pub async fn clear(&self, event: &TriggerEvent) -> Result<ClearReport> {
        event.require_region()?;
        self.run_clear()
            .instrument(obs::invocation_span("clear", event))
            .await
    }

    /// Derived state of every detached volume. Performs no writes.
    pub async fn inspect(
        &self,
        event: &TriggerEvent,
        now: DateTime<Utc>,
    ) -> Result<Vec<VolumeStatus>> {
        event.require_region()?;
        let volumes = self.resources.list_detached().await?;
        Ok(volumes
            .iter()
            .map(|v| {
                let raw = find_tag(&v.tags, &self.marker_key);
                VolumeStatus {
                    resource_id: v.id.clone(),
                    state: lifecycle_state(v, &self.marker_key, self.config.warning_days, now),
                    malformed_marker: raw
                        .filter(|r| parse_marker(r).is_none())
                        .map(str::to_string),
                }
            })
            .collect())
    }

    async fn run_mark(&self, now: DateTime<Utc>) -> Result<MarkReport> {
        let volumes = self.resources.list_detached().await?;
        Ok(self.mark_volumes(&volumes, now).await)
    }

    async fn run_sweep(&self, event: &TriggerEvent, now: DateTime<Utc>) -> Result<SweepReport> {
        let volumes = self.resources.list_detached().await?;
        let (warned, warning) = self.warn_volumes(event, &volumes, now).await;
        let (deleted, failures, confirmation) = self.delete_volumes(event, &volumes, now).await;
        Ok(SweepReport {
            scanned: volumes.len(),
            warned,
            warning,
            deleted,
            confirmation,
            failures,
        })
    }

    async fn run_clear(&self) -> Result<ClearReport> {
        let volumes = self.resources.list_detached().await?;
        Ok(self.clear_volumes(&volumes).await)
    }

    // -----------------------------------------------------------------------
    // Phases over an already-fetched snapshot
    // -----------------------------------------------------------------------

    pub async fn mark_volumes(&self, volumes: &[Resource], now: DateTime<Utc>) -> MarkReport {
        let selection = partition(volumes, &self.marker_key, self.config.warning_days, now);
        let marker = Tag::new(
            self.marker_key.clone(),
            format_marker(add_days(now, self.config.retention_days)),
        );

        let mut marked = Vec::new();
        let mut failures = Vec::new();
        for volume in &selection.to_mark {
            if let Some(raw) = volume.tag(&self.marker_key) {
                obs::emit_malformed_marker(&volume.id, raw);
            }
            match self.resources.set_tag(&volume.id, &marker).await {
                Ok(()) => {
                    debug!(resource_id = %volume.id, delete_on = %marker.value, "volume marked");
                    marked.push(volume.id.clone());
                }
                Err(e) => {
                    obs::emit_gateway_failure(&volume.id, "set_marker", &e);
                    failures.push(ResourceFailure {
                        resource_id: volume.id.clone(),
                        action: GatewayAction::SetMarker,
                        error: e.to_string(),
                    });
                }
            }
        }

        let already_scheduled = volumes.len() - selection.to_mark.len();
        obs::emit_volumes_marked(volumes.len(), marked.len(), already_scheduled);
        MarkReport {
            scanned: volumes.len(),
            marked,
            already_scheduled,
            failures,
        }
    }

    /// Publish one warning for every volume strictly inside the warning
    /// window. An empty batch publishes nothing.
    pub async fn warn_volumes(
        &self,
        event: &TriggerEvent,
        volumes: &[Resource],
        now: DateTime<Utc>,
    ) -> (Vec<String>, PublishOutcome) {
        let selection = partition(volumes, &self.marker_key, self.config.warning_days, now);
        if selection.to_warn.is_empty() {
            return (Vec::new(), PublishOutcome::Skipped);
        }

        let warned: Vec<String> = selection.to_warn.iter().map(|(r, _)| r.id.clone()).collect();
        let notification = compose_warning(event, &self.config, &selection.to_warn);
        let outcome = self.publish(&notification).await;
        if outcome.is_published() {
            obs::emit_warning_published(&self.config.channel, warned.len());
        }
        (warned, outcome)
    }

    /// Submit deletion of every past-due volume, then publish one
    /// confirmation naming every volume a deletion was submitted for.
    ///
    /// Returns the accepted deletions; rejected calls land in the failures.
    pub async fn delete_volumes(
        &self,
        event: &TriggerEvent,
        volumes: &[Resource],
        now: DateTime<Utc>,
    ) -> (Vec<String>, Vec<ResourceFailure>, PublishOutcome) {
        let selection = partition(volumes, &self.marker_key, self.config.warning_days, now);
        if selection.to_delete.is_empty() {
            return (Vec::new(), Vec::new(), PublishOutcome::Skipped);
        }

        let submitted: Vec<String> = selection.to_delete.iter().map(|v| v.id.clone()).collect();
        let mut deleted = Vec::new();
        let mut failures = Vec::new();
        for volume in &selection.to_delete {
            debug!(resource_id = %volume.id, "submitting volume deletion");
            match self.resources.delete(&volume.id).await {
                Ok(()) => deleted.push(volume.id.clone()),
                Err(e) => {
                    obs::emit_gateway_failure(&volume.id, "delete", &e);
                    failures.push(ResourceFailure {
                        resource_id: volume.id.clone(),
                        action: GatewayAction::Delete,
                        error: e.to_string(),
                    });
                }
            }
        }
        obs::emit_deletions_submitted(deleted.len(), failures.len());

        let notification = compose_confirmation(event, &self.config, &submitted);
        let outcome = self.publish(&notification).await;
        (deleted, failures, outcome)
    }

    pub async fn clear_volumes(&self, volumes: &[Resource]) -> ClearReport {
        let mut cleared = Vec::new();
        let mut failures = Vec::new();
        for volume in volumes {
            match self.resources.remove_tag(&volume.id, &self.marker_key).await {
                Ok(()) => cleared.push(volume.id.clone()),
                Err(e) => {
                    obs::emit_gateway_failure(&volume.id, "remove_marker", &e);
                    failures.push(ResourceFailure {
                        resource_id: volume.id.clone(),
                        action: GatewayAction::RemoveMarker,
                        error: e.to_string(),
                    });
                }
            }
        }
        obs::emit_markers_cleared(cleared.len(), failures.len());
        ClearReport {
            scanned: volumes.len(),
            cleared,
            failures,
        }
    }

    async fn publish(&self, notification: &Notification) -> PublishOutcome {
        deliver(self.notifier.as_ref(), &self.config.channel, notification).await
    }
}
