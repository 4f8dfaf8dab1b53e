//! Tag compliance evaluation for compute instances.
//!
//! Evaluates an instance's tags against a [`TagRuleSet`] to produce a
//! [`TagVerdict`]. [`TagComplianceChecker`] wires the evaluation to the
//! instance and notification gateways: advisory only, it never stops or
//! modifies the instance.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tagwarden_gateway::{Instance, InstanceGateway, NotificationGateway, Tag};
use tracing::{debug, Instrument};

use crate::config::ComplianceConfig;
use crate::error::Result;
use crate::event::TriggerEvent;
use crate::lifecycle::{deliver, Notification, PublishOutcome};
use crate::obs;

/// A single tag requirement slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TagRule {
    /// The named tag must be present with a non-blank value.
    Present { tag: String },
    /// Any one of the named tags satisfies the slot.
    AnyOf { tags: Vec<String> },
}

impl TagRule {
    pub fn present(tag: impl Into<String>) -> Self {
        TagRule::Present { tag: tag.into() }
    }

    pub fn any_of<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagRule::AnyOf {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Display name of the slot, e.g. `PO_Number or Cost_Center`.
    pub fn slot_name(&self) -> String {
        match self {
            TagRule::Present { tag } => tag.clone(),
            TagRule::AnyOf { tags } => tags.join(" or "),
        }
    }

    fn is_satisfied(&self, tags: &[Tag]) -> bool {
        match self {
            TagRule::Present { tag } => has_value(tags, tag),
            TagRule::AnyOf { tags: names } => names.iter().any(|n| has_value(tags, n)),
        }
    }
}

/// Requirement slots, evaluated in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagRuleSet {
    pub rules: Vec<TagRule>,
}

impl TagRuleSet {
    /// Standard instance policy: a project code (`PO_Number` or
    /// `Cost_Center`), `Application_Name`, `Approver`, `Owner`, `Name`.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                TagRule::any_of(["PO_Number", "Cost_Center"]),
                TagRule::present("Application_Name"),
                TagRule::present("Approver"),
                TagRule::present("Owner"),
                TagRule::present("Name"),
            ],
        }
    }

    pub fn with_rule(mut self, rule: TagRule) -> Self {
        self.rules.push(rule);
        self
    }
}

impl Default for TagRuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagViolation {
    pub rule: TagRule,
    /// Human-readable request, e.g. `Please provide missing tag: Owner`
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagVerdict {
    /// Unmet slots in declaration order (empty when compliant)
    pub violations: Vec<TagViolation>,
}

impl TagVerdict {
    pub fn compliant(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.message.clone()).collect()
    }
}

/// Keys and values are compared trimmed; a blank value counts as absent.
fn has_value(tags: &[Tag], key: &str) -> bool {
    tags.iter()
        .any(|t| t.key.trim() == key && !t.value.trim().is_empty())
}

/// Evaluate a tag set against a rule set. Pure.
pub fn evaluate_tags(rule_set: &TagRuleSet, tags: &[Tag]) -> TagVerdict {
    let violations = rule_set
        .rules
        .iter()
        .filter(|rule| !rule.is_satisfied(tags))
        .map(|rule| TagViolation {
            rule: rule.clone(),
            message: format!("Please provide missing tag: {}", rule.slot_name()),
        })
        .collect();
    TagVerdict { violations }
}

/// Alert for one non-compliant instance.
pub fn compose_alert(instance: &Instance, verdict: &TagVerdict) -> Notification {
    let mut body = format!(
        "As a courtesy, the EC2 instance with id [{}] was NOT prevented from being started, \
         but the tags are non-compliant and need to be corrected.\n\n",
        instance.id
    );
    body.push_str("Currently the tags look like: \n\n");
    for tag in &instance.tags {
        body.push_str(&format!("{}: {}\n", tag.key, tag.value));
    }
    body.push_str("\nPlease correct the following tag requirements:\n\n");
    for violation in &verdict.violations {
        body.push_str(&format!(" * {}\n", violation.message));
    }
    body.push_str("\nWith love from the Cloud Services team! :)\n");

    Notification {
        subject: format!(
            "ALERT: EC2 instance [{}] has non-compliant tagging",
            instance.id
        ),
        body,
    }
}

/// Outcome of one compliance check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub instance_id: String,
    pub compliant: bool,
    /// Unmet requirement messages in declaration order
    pub missing: Vec<String>,
    pub notification: PublishOutcome,
}

/// Runs the rule set against a freshly launched instance.
pub struct TagComplianceChecker {
    instances: Arc<dyn InstanceGateway>,
    notifier: Arc<dyn NotificationGateway>,
    config: ComplianceConfig,
    rules: TagRuleSet,
}

impl TagComplianceChecker {
    pub fn new(
        instances: Arc<dyn InstanceGateway>,
        notifier: Arc<dyn NotificationGateway>,
        config: ComplianceConfig,
    ) -> Self {
        Self {
            instances,
            notifier,
            config,
            rules: TagRuleSet::standard(),
        }
    }

    pub fn with_rules(mut self, rules: TagRuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &TagRuleSet {
        &self.rules
    }

    /// Wait the configured pre-check delay, then evaluate the instance
    /// named by the event and alert once if any slot is unmet.
    pub async fn check(&self, event: &TriggerEvent) -> Result<ComplianceReport> {
        event.require_region()?;
        let instance_id = event.require_instance_id()?.to_string();
        self.run_check(instance_id)
            .instrument(obs::invocation_span("check_tags", event))
            .await
    }

    async fn run_check(&self, instance_id: String) -> Result<ComplianceReport> {
        if !self.config.pre_check_delay.is_zero() {
            debug!(delay = ?self.config.pre_check_delay, "waiting for post-launch tagging");
            tokio::time::sleep(self.config.pre_check_delay).await;
        }

        let instance = self.instances.describe_instance(&instance_id).await?;
        let verdict = evaluate_tags(&self.rules, &instance.tags);
        obs::emit_compliance_evaluated(&instance.id, verdict.violations.len());

        let notification = if verdict.compliant() {
            PublishOutcome::Skipped
        } else {
            for message in verdict.messages() {
                debug!(instance_id = %instance.id, "{}", message);
            }
            self.publish(&compose_alert(&instance, &verdict)).await
        };

        Ok(ComplianceReport {
            instance_id: instance.id,
            compliant: verdict.compliant(),
            missing: verdict.messages(),
            notification,
        })
    }

    async fn publish(&self, notification: &Notification) -> PublishOutcome {
        deliver(self.notifier.as_ref(), &self.config.channel, notification).await
    }
}
