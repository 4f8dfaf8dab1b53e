//! Text codec for lifecycle marker timestamps.
//!
//! Markers are stored as `YYYY-MM-DDTHH:MM:SSZ` (UTC, second precision).
//! Anything that does not match that exact shape is unparseable, and callers
//! treat unparseable markers as absent.

use chrono::{DateTime, Days, NaiveDateTime, SubsecRound, Utc};

/// `chrono` format string for marker values.
pub const MARKER_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const MARKER_LEN: usize = 20;

/// Render a timestamp as marker text. Sub-second precision is dropped.
pub fn format_marker(at: DateTime<Utc>) -> String {
    at.trunc_subsecs(0).format(MARKER_FORMAT).to_string()
}

/// Parse marker text. Returns `None` for anything but the exact pattern.
pub fn parse_marker(text: &str) -> Option<DateTime<Utc>> {
    if !has_marker_shape(text) {
        return None;
    }
    NaiveDateTime::parse_from_str(text, MARKER_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn has_marker_shape(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == MARKER_LEN
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            10 => *b == b'T',
            13 | 16 => *b == b':',
            19 => *b == b'Z',
            _ => b.is_ascii_digit(),
        })
}

/// Calendar-day arithmetic; `days` may be negative. Saturates at the
/// representable range instead of panicking.
pub fn add_days(at: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    let shifted = if days >= 0 {
        at.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        at.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.unwrap_or(if days >= 0 {
        DateTime::<Utc>::MAX_UTC
    } else {
        DateTime::<Utc>::MIN_UTC
    })
}
