// =============================================================================
// Time utilities: interval table and timestamp formatting
// =============================================================================
//
// The interval table maps the provider's interval names to a duration in
// seconds.  It is built once on first use and never mutated afterwards.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Timelike};

pub const MINUTE_SECS: i64 = 60;
pub const HOUR_SECS: i64 = MINUTE_SECS * 60;
pub const DAY_SECS: i64 = HOUR_SECS * 24;
pub const WEEK_SECS: i64 = DAY_SECS * 7;
pub const MONTH_SECS: i64 = DAY_SECS * 30;
pub const YEAR_SECS: i64 = DAY_SECS * 365;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Supported interval names in ascending duration order.
const INTERVALS: [(&str, i64); 9] = [
    ("1m", MINUTE_SECS),
    ("5m", MINUTE_SECS * 5),
    ("15m", MINUTE_SECS * 15),
    ("30m", MINUTE_SECS * 30),
    ("1h", HOUR_SECS),
    ("1d", DAY_SECS),
    ("1wk", WEEK_SECS),
    ("1mo", MONTH_SECS),
    ("1y", YEAR_SECS),
];

static INTERVAL_TABLE: LazyLock<HashMap<&'static str, i64>> =
    LazyLock::new(|| INTERVALS.iter().copied().collect());

/// Duration of a named interval in seconds, e.g. `"1d"` → 86 400.
pub fn interval_seconds(name: &str) -> Option<i64> {
    INTERVAL_TABLE.get(name).copied()
}

pub fn is_valid_interval(name: &str) -> bool {
    INTERVAL_TABLE.contains_key(name)
}

/// Interval names accepted by [`interval_seconds`], shortest first.
pub fn supported_intervals() -> impl Iterator<Item = &'static str> {
    INTERVALS.iter().map(|(name, _)| *name)
}

/// Render a Unix timestamp (UTC) for the date column of a table.
///
/// Midnight timestamps print as a plain date; anything else carries the
/// time of day as well.  Out-of-range timestamps render as an empty string.
pub fn format_timestamp(epoch_sec: i64) -> String {
    match DateTime::from_timestamp(epoch_sec, 0) {
        Some(dt) if dt.num_seconds_from_midnight() == 0 => dt.format(DATE_FORMAT).to_string(),
        Some(dt) => dt.format(DATE_TIME_FORMAT).to_string(),
        None => String::new(),
    }
}
