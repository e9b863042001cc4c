//! Time utilities.
//!
//! Request signatures carry a second-resolution UTC timestamp; these helpers
//! produce and parse it.

use chrono::{DateTime, NaiveDateTime, Utc};

/// `strftime` format of the `X-Timestamp` header, e.g. `2025-06-03T15:42:00Z`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Returns the current Unix timestamp in seconds.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Returns the current UTC time formatted for `X-Timestamp`.
pub fn iso8601_now() -> String {
    format_timestamp(&Utc::now())
}

/// Formats a UTC time for `X-Timestamp`.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses an `X-Timestamp` value into Unix seconds.
pub fn parse_timestamp(text: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc().timestamp())
}
