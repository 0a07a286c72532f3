//! Temporal format detection for string values

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

// Prefix match: fractional seconds and offsets may follow.
static TIMESTAMP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").unwrap());

static DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Whether the value starts with a full ISO-8601 timestamp (`YYYY-MM-DDTHH:MM:SS`)
pub fn is_timestamp(value: &str) -> bool {
    TIMESTAMP_REGEX.is_match(value)
}

/// Whether the value is exactly `YYYY-MM-DD` and names a real calendar date
pub fn is_date(value: &str) -> bool {
    DATE_REGEX.is_match(value) && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}
