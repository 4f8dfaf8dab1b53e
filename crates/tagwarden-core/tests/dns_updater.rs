//! DNS updater behaviour with in-memory zones and credential strategies.

use std::sync::Arc;

use tagwarden_core::{
    CredentialChain, DnsConfig, DnsOutcome, DnsUpdater, JanitorError, TriggerEvent,
};
use tagwarden_gateway::fakes::{
    FailingCredential, MemoryDnsZone, MemoryResourceGateway, StaticCredential,
};
use tagwarden_gateway::{DnsZoneGateway, Instance, RecordSet, RecordType, Tag};

const ZONE_ID: &str = "Z1BRVK3TABIDQ9";

fn instance(name: &str, ip: Option<&str>) -> Instance {
    Instance {
        id: "i-0abc".to_string(),
        private_ip: ip.map(str::to_string),
        tags: vec![Tag::new("Name", name)],
    }
}

fn launch() -> TriggerEvent {
    TriggerEvent::scheduled("us-east-1", "111122223333").with_instance_id("i-0abc")
}

fn updater(instance: Instance, chain: CredentialChain) -> DnsUpdater {
    DnsUpdater::new(
        Arc::new(MemoryResourceGateway::new().with_instance(instance)),
        chain,
        DnsConfig::new(ZONE_ID, "arn:aws:iam::444455556666:role/UpdateZone"),
    )
    .unwrap()
}

fn local_only(zone: Arc<MemoryDnsZone>) -> CredentialChain {
    CredentialChain::local_then_assumed(
        Arc::new(StaticCredential::new("local-identity", zone)),
        Arc::new(FailingCredential::new("assumed-role", "not needed")),
    )
}

#[tokio::test]
async fn upsert_creates_a_record_with_ttl_300() {
    let zone = Arc::new(MemoryDnsZone::new().with_zone(ZONE_ID, "corp.example.com."));
    let u = updater(instance(" lx238db01 ", Some("10.0.4.7")), local_only(zone.clone()));

    let outcome = u.upsert_for_instance(&launch()).await.unwrap();
    assert_eq!(
        outcome,
        DnsOutcome::Upserted {
            fqdn: "lx238db01.corp.example.com.".to_string(),
            ip: "10.0.4.7".to_string(),
        }
    );
    assert_eq!(
        zone.records(ZONE_ID),
        vec![RecordSet {
            name: "lx238db01.corp.example.com.".to_string(),
            record_type: RecordType::A,
            ttl: 300,
            values: vec!["10.0.4.7".to_string()],
        }]
    );
}

#[tokio::test]
async fn upsert_replaces_existing_address() {
    let zone = Arc::new(MemoryDnsZone::new().with_zone(ZONE_ID, "corp.example.com."));
    updater(instance("lx238db01", Some("10.0.4.7")), local_only(zone.clone()))
        .upsert_for_instance(&launch())
        .await
        .unwrap();
    updater(instance("lx238db01", Some("10.0.9.9")), local_only(zone.clone()))
        .upsert_for_instance(&launch())
        .await
        .unwrap();

    let records = zone.records(ZONE_ID);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].values, vec!["10.0.9.9"]);
}

#[tokio::test]
async fn falls_back_to_assumed_role_when_zone_not_local() {
    let local = Arc::new(MemoryDnsZone::new().with_zone("ZLOCAL", "dev.example.com."));
    let remote = Arc::new(MemoryDnsZone::new().with_zone(ZONE_ID, "corp.example.com."));
    let chain = CredentialChain::local_then_assumed(
        Arc::new(StaticCredential::new("local-identity", local.clone())),
        Arc::new(StaticCredential::new("assumed-role", remote.clone())),
    );

    let outcome = updater(instance("lx238web02", Some("10.0.0.2")), chain)
        .upsert_for_instance(&launch())
        .await
        .unwrap();
    assert!(matches!(outcome, DnsOutcome::Upserted { .. }));
    assert_eq!(remote.records(ZONE_ID).len(), 1);
    assert!(local.records("ZLOCAL").is_empty());
}

#[tokio::test]
async fn zone_invisible_to_every_strategy_is_an_error() {
    let other = Arc::new(MemoryDnsZone::new().with_zone("ZOTHER", "other.example.com."));
    let chain = CredentialChain::local_then_assumed(
        Arc::new(StaticCredential::new("local-identity", other)),
        Arc::new(FailingCredential::new("assumed-role", "access denied")),
    );

    let err = updater(instance("lx238web02", Some("10.0.0.2")), chain)
        .upsert_for_instance(&launch())
        .await
        .unwrap_err();
    assert!(matches!(err, JanitorError::ZoneNotFound { zone_id } if zone_id == ZONE_ID));
}

#[tokio::test]
async fn non_qualifying_hostnames_are_skipped() {
    for name in ["win238app", "lx238 app", ""] {
        let zone = Arc::new(MemoryDnsZone::new().with_zone(ZONE_ID, "corp.example.com."));
        let outcome = updater(instance(name, Some("10.0.0.3")), local_only(zone.clone()))
            .upsert_for_instance(&launch())
            .await
            .unwrap();
        assert!(matches!(outcome, DnsOutcome::Skipped { .. }), "{name:?}");
        assert!(zone.records(ZONE_ID).is_empty());
    }
}

#[tokio::test]
async fn instance_without_address_is_skipped() {
    let zone = Arc::new(MemoryDnsZone::new().with_zone(ZONE_ID, "corp.example.com."));
    let outcome = updater(instance("lx238db01", None), local_only(zone.clone()))
        .upsert_for_instance(&launch())
        .await
        .unwrap();
    assert!(matches!(outcome, DnsOutcome::Skipped { .. }));
}

#[tokio::test]
async fn remove_deletes_matching_record() {
    let zone = Arc::new(MemoryDnsZone::new().with_zone(ZONE_ID, "corp.example.com."));
    zone.upsert_record(
        ZONE_ID,
        &RecordSet {
            name: "lx238db01.corp.example.com.".to_string(),
            record_type: RecordType::A,
            ttl: 300,
            values: vec!["10.0.4.7".to_string()],
        },
    )
    .await
    .unwrap();
    zone.upsert_record(
        ZONE_ID,
        &RecordSet {
            name: "lx238db02.corp.example.com.".to_string(),
            record_type: RecordType::A,
            ttl: 300,
            values: vec!["10.0.4.8".to_string()],
        },
    )
    .await
    .unwrap();

    let outcome = updater(instance("lx238db01", None), local_only(zone.clone()))
        .remove_for_instance(&launch())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DnsOutcome::Removed {
            fqdn: "lx238db01.corp.example.com.".to_string()
        }
    );
    let left = zone.records(ZONE_ID);
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].name, "lx238db02.corp.example.com.");
}

#[tokio::test]
async fn remove_missing_record_is_a_noop() {
    let zone = Arc::new(MemoryDnsZone::new().with_zone(ZONE_ID, "corp.example.com."));
    let outcome = updater(instance("lx238db01", None), local_only(zone))
        .remove_for_instance(&launch())
        .await
        .unwrap();
    assert!(matches!(outcome, DnsOutcome::NotFound { .. }));
}
