//! Conversions between JSON row values and driver-native values

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Number, Value};

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// JSON number from a float; non-finite values become null
pub fn float_value(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Text form of a value for string columns; `None` for null
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Integer view of a number, numeric string, or boolean
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Float view of a number or numeric string
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Boolean view of a bool, 0/1, or a truthy/falsy string
pub fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Parse an ISO-8601 timestamp, with or without offset, as UTC wall time
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| parse_date(text).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

/// Parse a `YYYY-MM-DD` date, ignoring any time part
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let date = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Render a timestamp the way the profiler recognises it
pub fn timestamp_text(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Render a date as `YYYY-MM-DD`
pub fn date_text(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

/// Best-effort typing of a text cell: numbers, booleans, empty as null
pub fn coerce_text(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        // Leading zeros are identifiers, not numbers
        if !(trimmed.len() > 1 && trimmed.starts_with('0')) {
            return Value::from(i);
        }
    } else if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() && !trimmed.starts_with('.') {
            return float_value(f);
        }
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_views() {
        assert_eq!(value_as_i64(&json!(42)), Some(42));
        assert_eq!(value_as_i64(&json!(3.0)), Some(3));
        assert_eq!(value_as_i64(&json!(3.5)), None);
        assert_eq!(value_as_i64(&json!(" 7 ")), Some(7));
        assert_eq!(value_as_f64(&json!("2.5")), Some(2.5));
        assert_eq!(value_as_bool(&json!("yes")), Some(true));
        assert_eq!(value_as_bool(&json!(0)), Some(false));
        assert_eq!(value_as_text(&json!({"a": 1})).as_deref(), Some("{\"a\":1}"));
        assert_eq!(value_as_text(&Value::Null), None);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let utc = parse_timestamp("2024-01-01T10:00:00+02:00").unwrap();
        assert_eq!(timestamp_text(&utc), "2024-01-01T08:00:00");
        assert!(parse_timestamp("2024-01-01 10:00:00.250").is_some());
        assert_eq!(
            timestamp_text(&parse_timestamp("2024-03-05").unwrap()),
            "2024-03-05T00:00:00"
        );
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_coerce_text() {
        assert_eq!(coerce_text("42"), json!(42));
        assert_eq!(coerce_text("-1.25"), json!(-1.25));
        assert_eq!(coerce_text("TRUE"), json!(true));
        assert_eq!(coerce_text(""), Value::Null);
        assert_eq!(coerce_text("007"), json!("007"));
        assert_eq!(coerce_text("abc"), json!("abc"));
    }
}
