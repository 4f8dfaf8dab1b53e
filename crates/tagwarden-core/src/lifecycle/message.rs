//! Message composition for warning and deletion-confirmation notifications.

use chrono::{DateTime, Utc};
use tagwarden_gateway::{NotificationGateway, Resource};

use super::report::PublishOutcome;
use crate::codec::format_marker;
use crate::config::JanitorConfig;
use crate::event::TriggerEvent;
use crate::obs;

/// Subject + body ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

/// Resolve `channel` and publish once. Failures are logged and reported,
/// never raised.
pub async fn deliver(
    notifier: &dyn NotificationGateway,
    channel: &str,
    notification: &Notification,
) -> PublishOutcome {
    let sent = match notifier.ensure_channel(channel).await {
        Ok(handle) => {
            notifier
                .publish(&handle, &notification.subject, &notification.body)
                .await
        }
        Err(e) => Err(e),
    };
    match sent {
        Ok(()) => PublishOutcome::Published {
            channel: channel.to_string(),
        },
        Err(e) => {
            obs::emit_notification_failure(channel, &e);
            PublishOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

fn account_header(event: &TriggerEvent) -> String {
    format!("Account: {} ({})\n\n", event.account, event.region)
}

/// One warning listing every volume inside the warning window.
pub fn compose_warning(
    event: &TriggerEvent,
    config: &JanitorConfig,
    batch: &[(&Resource, DateTime<Utc>)],
) -> Notification {
    let mut body = account_header(event);
    body.push_str(&format!(
        "The following EBS Volumes are scheduled for deletion within the next {} days:\n\n",
        config.warning_days
    ));
    for (resource, delete_on) in batch {
        body.push_str(&format!("{} -> {}\n", resource.id, format_marker(*delete_on)));
        body.push_str("Tags: ");
        for tag in &resource.tags {
            body.push_str(&format!("{} ", tag));
        }
        body.push_str("\n\n");
    }
    body.push_str(&format!(
        "If you would like to prevent a volume from deletion, you can remove the Volume tag: [{}] \
         or set the tag value to a future date.\n\n",
        config.marker_key()
    ));
    body.push_str(&config.sign_off);

    Notification {
        subject: format!(
            "[{}] WARN: Detached Volumes Scheduled for Deletion",
            event.account
        ),
        body,
    }
}

/// One confirmation listing every volume whose deletion was submitted.
pub fn compose_confirmation(
    event: &TriggerEvent,
    config: &JanitorConfig,
    submitted: &[String],
) -> Notification {
    let mut body = account_header(event);
    body.push_str("The following EBS volumes have been submitted for deletion:\n\n");
    for id in submitted {
        body.push_str(id);
        body.push('\n');
    }
    body.push_str(
        "\nIf a volume was removed before you were ready, it may still be retrievable \
         from a nightly snapshot.\n\n",
    );
    body.push_str(&config.sign_off);

    Notification {
        subject: format!("[{}] INFO: Detached Volumes Deletion Completed", event.account),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tagwarden_gateway::Tag;

    #[test]
    fn warning_lists_id_date_and_tags() {
        let event = TriggerEvent::scheduled("us-east-1", "1234");
        let config = JanitorConfig::default();
        let vol = Resource::new("vol-9", vec![Tag::new("Owner", "ops")]);
        let when = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let n = compose_warning(&event, &config, &[(&vol, when)]);
        assert_eq!(n.subject, "[1234] WARN: Detached Volumes Scheduled for Deletion");
        assert!(n.body.starts_with("Account: 1234 (us-east-1)"));
        assert!(n.body.contains("within the next 7 days"));
        assert!(n.body.contains("vol-9 -> 2024-02-01T00:00:00Z"));
        assert!(n.body.contains("{Owner: ops}"));
        assert!(n.body.contains(&config.marker_key()));
        assert!(n.body.ends_with(&config.sign_off));
    }

    #[test]
    fn confirmation_lists_each_submitted_id() {
        let event = TriggerEvent::scheduled("us-east-1", "1234");
        let n = compose_confirmation(
            &event,
            &JanitorConfig::default(),
            &["vol-1".to_string(), "vol-2".to_string()],
        );
        assert_eq!(n.subject, "[1234] INFO: Detached Volumes Deletion Completed");
        assert!(n.body.contains("vol-1\nvol-2\n"));
    }
}
