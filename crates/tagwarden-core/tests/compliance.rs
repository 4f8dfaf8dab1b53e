//! Compliance checker against in-memory gateways.

use std::sync::Arc;
use std::time::Duration;

use tagwarden_core::lifecycle::PublishOutcome;
use tagwarden_core::{
    ComplianceConfig, JanitorError, TagComplianceChecker, TagRule, TagRuleSet, TriggerEvent,
};
use tagwarden_gateway::fakes::{MemoryNotifier, MemoryResourceGateway};
use tagwarden_gateway::{Instance, Tag};

fn instance(id: &str, tags: Vec<Tag>) -> Instance {
    Instance {
        id: id.to_string(),
        private_ip: Some("10.1.2.3".to_string()),
        tags,
    }
}

fn compliant_tags() -> Vec<Tag> {
    vec![
        Tag::new("Cost_Center", "CC-42"),
        Tag::new("Application_Name", "ledger"),
        Tag::new("Approver", "kim"),
        Tag::new("Owner", "platform"),
        Tag::new("Name", "lx238ledger01"),
    ]
}

fn launch_event(instance_id: &str) -> TriggerEvent {
    TriggerEvent::scheduled("eu-west-1", "210987654321").with_instance_id(instance_id)
}

fn checker(
    gateway: Arc<MemoryResourceGateway>,
    notifier: Arc<MemoryNotifier>,
) -> TagComplianceChecker {
    TagComplianceChecker::new(
        gateway,
        notifier,
        ComplianceConfig::default().with_pre_check_delay(Duration::ZERO),
    )
}

#[tokio::test]
async fn compliant_instance_sends_nothing() {
    let gateway =
        Arc::new(MemoryResourceGateway::new().with_instance(instance("i-ok", compliant_tags())));
    let notifier = Arc::new(MemoryNotifier::new());

    let report = checker(gateway, notifier.clone())
        .check(&launch_event("i-ok"))
        .await
        .unwrap();
    assert!(report.compliant);
    assert!(report.missing.is_empty());
    assert_eq!(report.notification, PublishOutcome::Skipped);
    assert_eq!(notifier.publish_count(), 0);
}

#[tokio::test]
async fn non_compliant_instance_alerts_once() {
    let tags = vec![Tag::new("Owner", "platform"), Tag::new("Approver", " ")];
    let gateway = Arc::new(MemoryResourceGateway::new().with_instance(instance("i-bad", tags)));
    let notifier = Arc::new(MemoryNotifier::new());

    let report = checker(gateway, notifier.clone())
        .check(&launch_event("i-bad"))
        .await
        .unwrap();
    assert!(!report.compliant);
    assert_eq!(
        report.missing,
        vec![
            "Please provide missing tag: PO_Number or Cost_Center",
            "Please provide missing tag: Application_Name",
            "Please provide missing tag: Approver",
            "Please provide missing tag: Name",
        ]
    );

    let published = notifier.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].channel, "Lambda-EC2InstanceTagCompliance");
    assert_eq!(
        published[0].subject,
        "ALERT: EC2 instance [i-bad] has non-compliant tagging"
    );
    assert!(published[0].body.contains("Owner: platform"));
    assert!(published[0].body.contains(" * Please provide missing tag: Name"));
}

#[tokio::test]
async fn either_project_tag_satisfies_the_slot() {
    let mut tags = compliant_tags();
    tags[0] = Tag::new("PO_Number", "PO-7");
    let gateway = Arc::new(MemoryResourceGateway::new().with_instance(instance("i-po", tags)));

    let report = checker(gateway, Arc::new(MemoryNotifier::new()))
        .check(&launch_event("i-po"))
        .await
        .unwrap();
    assert!(report.compliant);
}

#[tokio::test]
async fn custom_rule_set_is_honoured() {
    let gateway =
        Arc::new(MemoryResourceGateway::new().with_instance(instance("i-ok", compliant_tags())));
    let report = checker(gateway, Arc::new(MemoryNotifier::new()))
        .with_rules(TagRuleSet::standard().with_rule(TagRule::present("Environment")))
        .check(&launch_event("i-ok"))
        .await
        .unwrap();
    assert_eq!(
        report.missing,
        vec!["Please provide missing tag: Environment"]
    );
}

#[tokio::test]
async fn publish_failure_is_reported() {
    let gateway = Arc::new(MemoryResourceGateway::new().with_instance(instance("i-bad", vec![])));
    let notifier = Arc::new(MemoryNotifier::new());
    notifier.fail_publish("endpoint down");

    let report = checker(gateway, notifier)
        .check(&launch_event("i-bad"))
        .await
        .unwrap();
    assert!(matches!(report.notification, PublishOutcome::Failed { .. }));
}

#[tokio::test]
async fn missing_instance_id_is_an_event_error() {
    let gateway = Arc::new(MemoryResourceGateway::new());
    let err = checker(gateway.clone(), Arc::new(MemoryNotifier::new()))
        .check(&TriggerEvent::scheduled("eu-west-1", "1"))
        .await
        .unwrap_err();
    assert!(matches!(err, JanitorError::Event(_)));
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn unknown_instance_is_a_gateway_error() {
    let err = checker(
        Arc::new(MemoryResourceGateway::new()),
        Arc::new(MemoryNotifier::new()),
    )
    .check(&launch_event("i-gone"))
    .await
    .unwrap_err();
    assert!(matches!(err, JanitorError::Gateway(_)));
}

#[tokio::test(start_paused = true)]
async fn pre_check_delay_elapses_before_describe() {
    let gateway =
        Arc::new(MemoryResourceGateway::new().with_instance(instance("i-ok", compliant_tags())));
    let checker = TagComplianceChecker::new(
        gateway,
        Arc::new(MemoryNotifier::new()),
        ComplianceConfig::default(),
    );

    let started = tokio::time::Instant::now();
    checker.check(&launch_event("i-ok")).await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(5));
}
