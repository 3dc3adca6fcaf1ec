//! Time and timestamp utilities

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_humanize::HumanTime;

/// Timestamp format used by the events API (`2024-01-31T12:00:00Z`)
pub const EVENT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Parse an API timestamp. Only the exact `YYYY-MM-DDTHH:MM:SSZ` form is accepted.
pub fn parse_event_date(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, EVENT_DATE_FORMAT).map(|naive| naive.and_utc())
}

/// Format a timestamp the way the API does
pub fn format_event_date(date: &DateTime<Utc>) -> String {
    date.format(EVENT_DATE_FORMAT).to_string()
}

/// Human-readable delta between `date` and `now`, e.g. "3 days ago"
pub fn relative_age(date: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    // Round to whole seconds so "now" never renders as a fraction
    let delta = Duration::seconds((*date - *now).num_seconds());
    HumanTime::from(delta).to_string()
}

/// Convert a day count to a chrono duration
pub fn days(n: u32) -> Duration {
    Duration::days(i64::from(n))
}
