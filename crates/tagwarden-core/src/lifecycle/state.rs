//! Volume lifecycle derived from the deletion marker tag.
//!
//! Nothing here is stored: each run reclassifies a fresh snapshot from the
//! marker value and the current instant, then [`partition`] selects what to
//! mark, warn about and delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tagwarden_gateway::{find_tag, Resource, Tag};

use crate::codec::{add_days, parse_marker};

/// Lifecycle of a detached volume, derived from its marker tag and "now".
///
/// Ordered stages (a volume only moves forward as time advances):
/// - Unmarked: no marker, or a marker that does not parse
/// - Marked: deletion scheduled, warning window not yet open
/// - WarningDue: strictly inside the warning window
/// - DueNow: the marker instant itself; neither warned nor deleted
/// - DeletionDue: marker strictly in the past
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    Unmarked,
    Marked { delete_on: DateTime<Utc> },
    WarningDue { delete_on: DateTime<Utc> },
    DueNow { delete_on: DateTime<Utc> },
    DeletionDue { delete_on: DateTime<Utc> },
}

impl LifecycleState {
    /// Scheduled deletion instant, if any.
    pub fn delete_on(self) -> Option<DateTime<Utc>> {
        match self {
            LifecycleState::Unmarked => None,
            LifecycleState::Marked { delete_on }
            | LifecycleState::WarningDue { delete_on }
            | LifecycleState::DueNow { delete_on }
            | LifecycleState::DeletionDue { delete_on } => Some(delete_on),
        }
    }

    /// Position in the forward-only ordering; used to check monotonicity.
    pub const fn stage(self) -> u8 {
        match self {
            LifecycleState::Unmarked => 0,
            LifecycleState::Marked { .. } => 1,
            LifecycleState::WarningDue { .. } => 2,
            LifecycleState::DueNow { .. } => 3,
            LifecycleState::DeletionDue { .. } => 4,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            LifecycleState::Unmarked => "unmarked",
            LifecycleState::Marked { .. } => "marked",
            LifecycleState::WarningDue { .. } => "warning_due",
            LifecycleState::DueNow { .. } => "due_now",
            LifecycleState::DeletionDue { .. } => "deletion_due",
        }
    }
}

/// Parsed marker value, or `None` when absent or malformed.
pub fn read_marker(tags: &[Tag], marker_key: &str) -> Option<DateTime<Utc>> {
    find_tag(tags, marker_key).and_then(parse_marker)
}

/// `delete_on - warning_days < now < delete_on`
pub fn in_warning_window(now: DateTime<Utc>, delete_on: DateTime<Utc>, warning_days: i64) -> bool {
    let opens_at = add_days(delete_on, -warning_days);
    now > opens_at && now < delete_on
}

/// `delete_on < now`
pub fn is_past_due(now: DateTime<Utc>, delete_on: DateTime<Utc>) -> bool {
    delete_on < now
}

/// Pure state derivation: `(now, marker) -> LifecycleState`.
pub fn classify(
    delete_on: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    warning_days: i64,
) -> LifecycleState {
    let Some(delete_on) = delete_on else {
        return LifecycleState::Unmarked;
    };
    if is_past_due(now, delete_on) {
        LifecycleState::DeletionDue { delete_on }
    } else if now == delete_on {
        LifecycleState::DueNow { delete_on }
    } else if in_warning_window(now, delete_on, warning_days) {
        LifecycleState::WarningDue { delete_on }
    } else {
        LifecycleState::Marked { delete_on }
    }
}

/// Derive the state of one resource from a fresh metadata snapshot.
pub fn lifecycle_state(
    resource: &Resource,
    marker_key: &str,
    warning_days: i64,
    now: DateTime<Utc>,
) -> LifecycleState {
    classify(read_marker(&resource.tags, marker_key), now, warning_days)
}

/// Three disjoint subsets of one resource snapshot.
#[derive(Debug, Default)]
pub struct Selection<'a> {
    /// No valid marker: Mark writes one
    pub to_mark: Vec<&'a Resource>,
    /// Inside the warning window, paired with their deletion instant
    pub to_warn: Vec<(&'a Resource, DateTime<Utc>)>,
    /// Past due: Delete removes them
    pub to_delete: Vec<&'a Resource>,
}

/// Partition resources by lifecycle state, preserving input order.
pub fn partition<'a>(
    resources: &'a [Resource],
    marker_key: &str,
    warning_days: i64,
    now: DateTime<Utc>,
) -> Selection<'a> {
    let mut selection = Selection::default();
    for resource in resources {
        match lifecycle_state(resource, marker_key, warning_days, now) {
            LifecycleState::Unmarked => selection.to_mark.push(resource),
            LifecycleState::WarningDue { delete_on } => {
                selection.to_warn.push((resource, delete_on))
            }
            LifecycleState::DeletionDue { .. } => selection.to_delete.push(resource),
            LifecycleState::Marked { .. } | LifecycleState::DueNow { .. } => {}
        }
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::format_marker;
    use chrono::{Duration, TimeZone};

    const KEY: &str = "ns:delete-scheduled-on";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    fn marked(id: &str, delete_on: DateTime<Utc>) -> Resource {
        Resource::new(id, vec![Tag::new(KEY, format_marker(delete_on))])
    }

    #[test]
    fn absent_marker_is_unmarked() {
        let r = Resource::new("vol-1", vec![Tag::new("Owner", "ops")]);
        assert_eq!(lifecycle_state(&r, KEY, 7, now()), LifecycleState::Unmarked);
    }

    #[test]
    fn malformed_marker_is_unmarked() {
        let r = Resource::new("vol-1", vec![Tag::new(KEY, "not-a-date")]);
        assert_eq!(lifecycle_state(&r, KEY, 7, now()), LifecycleState::Unmarked);
    }

    #[test]
    fn warning_window_opens_strictly_after_boundary() {
        let boundary = now() + Duration::days(7);
        assert!(matches!(
            classify(Some(boundary), now(), 7),
            LifecycleState::Marked { .. }
        ));
        let inside = boundary - Duration::seconds(1);
        assert!(matches!(
            classify(Some(inside), now(), 7),
            LifecycleState::WarningDue { .. }
        ));
    }

    #[test]
    fn deletion_is_strictly_after_marker() {
        assert!(matches!(
            classify(Some(now()), now(), 7),
            LifecycleState::DueNow { .. }
        ));
        assert!(matches!(
            classify(Some(now() - Duration::seconds(1)), now(), 7),
            LifecycleState::DeletionDue { .. }
        ));
    }

    #[test]
    fn zero_warning_window_never_warns() {
        let soon = now() + Duration::seconds(1);
        assert!(matches!(
            classify(Some(soon), now(), 0),
            LifecycleState::Marked { .. }
        ));
    }

    #[test]
    fn partition_yields_disjoint_sets() {
        let resources = vec![
            Resource::new("fresh", Vec::new()),
            marked("far", now() + Duration::days(20)),
            marked("soon", now() + Duration::days(3)),
            marked("exact", now()),
            marked("gone", now() - Duration::days(1)),
            Resource::new("junk", vec![Tag::new(KEY, "2024-99-99T00:00:00Z")]),
        ];
        let s = partition(&resources, KEY, 7, now());

        let ids = |v: &[&Resource]| v.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&s.to_mark), vec!["fresh", "junk"]);
        assert_eq!(
            s.to_warn.iter().map(|(r, _)| r.id.as_str()).collect::<Vec<_>>(),
            vec!["soon"]
        );
        assert_eq!(ids(&s.to_delete), vec!["gone"]);
    }

    #[test]
    fn stage_never_decreases_as_time_advances() {
        let delete_on = now() + Duration::days(30);
        let mut previous = 0;
        for hours in 0..=(32 * 24) {
            let at = now() + Duration::hours(hours);
            let stage = classify(Some(delete_on), at, 7).stage();
            assert!(stage >= previous, "regressed at +{hours}h");
            previous = stage;
        }
        assert_eq!(previous, LifecycleState::DeletionDue { delete_on }.stage());
    }
}
