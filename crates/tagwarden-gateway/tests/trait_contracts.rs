//! Trait contract tests for ResourceGateway, NotificationGateway and DnsZoneGateway.
//!
//! These tests verify the behavioral contracts of the gateway traits
//! using in-memory fakes. Any conforming implementation must pass these.

use std::sync::Arc;

use tagwarden_gateway::fakes::{
    FailOn, FailingCredential, GatewayCall, MemoryDnsZone, MemoryNotifier,
    MemoryResourceGateway, StaticCredential,
};
use tagwarden_gateway::gateway_traits::*;
use tagwarden_gateway::GatewayError;

fn volume(id: &str, tags: &[(&str, &str)]) -> Resource {
    Resource::new(
        id,
        tags.iter().map(|(k, v)| Tag::new(*k, *v)).collect(),
    )
}

// ===========================================================================
// ResourceGateway contract tests
// ===========================================================================

#[tokio::test]
async fn list_detached_excludes_attached_volumes() {
    let gateway = MemoryResourceGateway::new().with_volume(volume("vol-a", &[]));
    gateway.add_attached_volume(volume("vol-b", &[]));

    let listed = gateway.list_detached().await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["vol-a"]);
}

#[tokio::test]
async fn set_tag_overwrites_existing_value() {
    let gateway = MemoryResourceGateway::new().with_volume(volume("vol-a", &[("k", "old")]));
    gateway.set_tag("vol-a", &Tag::new("k", "new")).await.unwrap();

    let v = gateway.volume("vol-a").unwrap();
    assert_eq!(v.tags, vec![Tag::new("k", "new")]);
}

#[tokio::test]
async fn remove_tag_absent_key_is_noop() {
    let gateway = MemoryResourceGateway::new().with_volume(volume("vol-a", &[("k", "v")]));
    gateway.remove_tag("vol-a", "other").await.unwrap();
    assert_eq!(gateway.volume("vol-a").unwrap().tags.len(), 1);
}

#[tokio::test]
async fn set_tag_unknown_resource_is_not_found() {
    let gateway = MemoryResourceGateway::new();
    let err = gateway
        .set_tag("vol-missing", &Tag::new("k", "v"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotFound { .. }));
}

#[tokio::test]
async fn delete_removes_volume_and_second_delete_fails() {
    let gateway = MemoryResourceGateway::new().with_volume(volume("vol-a", &[]));
    gateway.delete("vol-a").await.unwrap();
    assert!(gateway.volume("vol-a").is_none());

    let err = gateway.delete("vol-a").await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound { .. }));
}

#[tokio::test]
async fn injected_failure_is_scoped_to_one_resource() {
    let gateway = MemoryResourceGateway::new()
        .with_volume(volume("vol-a", &[]))
        .with_volume(volume("vol-b", &[]));
    gateway.fail_on(FailOn::Delete, "vol-a");

    assert!(gateway.delete("vol-a").await.is_err());
    assert!(gateway.delete("vol-b").await.is_ok());
    assert_eq!(gateway.volume_ids(), vec!["vol-a".to_string()]);
}

#[tokio::test]
async fn calls_are_recorded_in_order() {
    let gateway = MemoryResourceGateway::new().with_volume(volume("vol-a", &[]));
    gateway.list_detached().await.unwrap();
    gateway.set_tag("vol-a", &Tag::new("k", "v")).await.unwrap();

    assert_eq!(
        gateway.calls(),
        vec![
            GatewayCall::ListDetached,
            GatewayCall::SetTag {
                resource_id: "vol-a".to_string(),
                key: "k".to_string(),
                value: "v".to_string(),
            },
        ]
    );
    assert_eq!(gateway.write_calls().len(), 1);
}

// ===========================================================================
// NotificationGateway contract tests
// ===========================================================================

#[tokio::test]
async fn ensure_channel_is_idempotent() {
    let notifier = MemoryNotifier::new();
    let a = notifier.ensure_channel("topic").await.unwrap();
    let b = notifier.ensure_channel("topic").await.unwrap();
    assert_eq!(a, b);
    assert_eq!(notifier.channels(), vec!["topic".to_string()]);
}

#[tokio::test]
async fn publish_records_subject_and_body() {
    let notifier = MemoryNotifier::new();
    let channel = notifier.ensure_channel("topic").await.unwrap();
    notifier.publish(&channel, "subject", "body").await.unwrap();

    let published = notifier.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].channel, "topic");
    assert_eq!(published[0].subject, "subject");
    assert_eq!(published[0].body, "body");
}

#[tokio::test]
async fn publish_failure_records_nothing() {
    let notifier = MemoryNotifier::new();
    let channel = notifier.ensure_channel("topic").await.unwrap();
    notifier.fail_publish("throttled");

    let err = notifier.publish(&channel, "s", "b").await.unwrap_err();
    assert!(matches!(err, GatewayError::ChannelUnavailable { .. }));
    assert_eq!(notifier.publish_count(), 0);
}

// ===========================================================================
// DnsZoneGateway / CredentialStrategy contract tests
// ===========================================================================

fn a_record(name: &str, ip: &str) -> RecordSet {
    RecordSet {
        name: name.to_string(),
        record_type: RecordType::A,
        ttl: 300,
        values: vec![ip.to_string()],
    }
}

#[tokio::test]
async fn upsert_replaces_record_with_same_name() {
    let dns = MemoryDnsZone::new().with_zone("Z1", "corp.example.com.");
    dns.upsert_record("Z1", &a_record("h.corp.example.com.", "10.0.0.1"))
        .await
        .unwrap();
    dns.upsert_record("Z1", &a_record("h.corp.example.com.", "10.0.0.2"))
        .await
        .unwrap();

    let records = dns.records("Z1");
    assert_eq!(records, vec![a_record("h.corp.example.com.", "10.0.0.2")]);
}

#[tokio::test]
async fn list_record_sets_starts_at_name() {
    let dns = MemoryDnsZone::new().with_zone("Z1", "corp.example.com.");
    dns.upsert_record("Z1", &a_record("b.corp.example.com.", "10.0.0.2"))
        .await
        .unwrap();
    dns.upsert_record("Z1", &a_record("a.corp.example.com.", "10.0.0.1"))
        .await
        .unwrap();

    let found = dns
        .list_record_sets("Z1", "b.corp.example.com.", RecordType::A)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "b.corp.example.com.");
}

#[tokio::test]
async fn delete_record_requires_exact_match() {
    let dns = MemoryDnsZone::new().with_zone("Z1", "corp.example.com.");
    dns.upsert_record("Z1", &a_record("h.corp.example.com.", "10.0.0.1"))
        .await
        .unwrap();

    let err = dns
        .delete_record("Z1", &a_record("h.corp.example.com.", "10.9.9.9"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Rejected { .. }));
    dns.delete_record("Z1", &a_record("h.corp.example.com.", "10.0.0.1"))
        .await
        .unwrap();
    assert!(dns.records("Z1").is_empty());
}

#[tokio::test]
async fn credential_strategies_yield_client_or_error() {
    let dns: Arc<dyn DnsZoneGateway> =
        Arc::new(MemoryDnsZone::new().with_zone("Z1", "corp.example.com."));
    let ok = StaticCredential::new("local-identity", dns);
    let client = ok.client().await.unwrap();
    assert_eq!(client.list_hosted_zones().await.unwrap().len(), 1);

    let bad = FailingCredential::new("assumed-role", "access denied");
    assert_eq!(bad.label(), "assumed-role");
    assert!(matches!(
        bad.client().await,
        Err(GatewayError::Credentials { .. })
    ));
}
