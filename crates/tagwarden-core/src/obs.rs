//! Structured observability hooks for Tagwarden invocations.
//!
//! This module provides:
//! - Invocation-scoped tracing spans via [`invocation_span`]
//! - Emission functions for key policy events: marking, warning, deletion,
//!   clearing, compliance evaluation, DNS changes and per-resource failures
//!
//! Events are emitted at `info!` level (failures at `warn!`). For JSON
//! output, run the binary with `--json`.

use tracing::{info, warn};

use crate::event::TriggerEvent;

/// Invocation-scoped span for one entry operation. Attach it to the
/// operation future with `tracing::Instrument`.
///
/// # Example
///
/// ```ignore
/// async { /* ... */ }.instrument(invocation_span("mark", &event)).await
/// // every event inside carries operation, region and account
/// ```
pub fn invocation_span(operation: &str, event: &TriggerEvent) -> tracing::Span {
    tracing::info_span!(
        "tagwarden.invocation",
        operation = %operation,
        region = %event.region,
        account = %event.account,
        event_id = %event.id,
    )
}

/// Emit event: mark pass finished.
pub fn emit_volumes_marked(scanned: usize, marked: usize, already_scheduled: usize) {
    info!(
        event = "lifecycle.marked",
        scanned = scanned,
        marked = marked,
        already_scheduled = already_scheduled,
    );
}

/// Emit event: a volume carried a marker that failed to parse.
pub fn emit_malformed_marker(resource_id: &str, raw: &str) {
    warn!(event = "lifecycle.malformed_marker", resource_id = %resource_id, raw = %raw);
}

/// Emit event: warning batch published.
pub fn emit_warning_published(channel: &str, volumes: usize) {
    info!(event = "lifecycle.warning_published", channel = %channel, volumes = volumes);
}

/// Emit event: deletion requests submitted.
pub fn emit_deletions_submitted(submitted: usize, failed: usize) {
    info!(
        event = "lifecycle.deletions_submitted",
        submitted = submitted,
        failed = failed,
    );
}

/// Emit event: clear pass finished.
pub fn emit_markers_cleared(cleared: usize, failed: usize) {
    info!(event = "lifecycle.cleared", cleared = cleared, failed = failed);
}

/// Emit event: one resource's gateway call failed; the batch continues.
pub fn emit_gateway_failure(resource_id: &str, action: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "gateway.call_failed",
        resource_id = %resource_id,
        action = %action,
        error = %error,
    );
}

/// Emit event: a notification could not be delivered.
pub fn emit_notification_failure(channel: &str, error: &dyn std::fmt::Display) {
    warn!(event = "notification.failed", channel = %channel, error = %error);
}

/// Emit event: compliance evaluated for an instance.
pub fn emit_compliance_evaluated(instance_id: &str, missing: usize) {
    info!(
        event = "compliance.evaluated",
        instance_id = %instance_id,
        compliant = missing == 0,
        missing = missing,
    );
}

/// Emit event: DNS record upserted or removed.
pub fn emit_dns_record_changed(action: &str, fqdn: &str, zone_id: &str) {
    info!(event = "dns.record_changed", action = %action, fqdn = %fqdn, zone_id = %zone_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_span_create() {
        let event = TriggerEvent::scheduled("us-east-1", "1234");
        let _entered = invocation_span("mark", &event).entered();
        emit_volumes_marked(3, 1, 2);
    }
}
