//! Timestamp helpers.

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;

/// UTC instant stored on responses.
pub type Timestamp = DateTime<Utc>;

/// Current time as RFC 3339 with microseconds and an explicit `+00:00` offset.
///
/// ```
/// use paychain::utils::iso_timestamp;
///
/// let stamp = iso_timestamp();
/// assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
/// assert!(stamp.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    now_utc().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Current UTC instant.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Fractional milliseconds, the unit used in events and metrics.
#[must_use]
pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
