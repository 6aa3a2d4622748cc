//! Timestamp helpers.
//!
//! Wire format is RFC 3339 UTC at second precision with a `Z` suffix
//! (`2026-08-01T12:00:00Z`); comparisons use integer epoch seconds and
//! event keys use integer epoch milliseconds.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp the way every document in the store expects it.
pub fn iso_utc(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn iso_utc_now() -> String {
    iso_utc(utc_now())
}

pub fn epoch_now() -> i64 {
    utc_now().timestamp()
}

pub fn epoch_ms_now() -> i64 {
    utc_now().timestamp_millis()
}

/// Parse an epoch out of either an integer-second value or an RFC 3339
/// string. Returns `None` for anything else.
pub fn parse_epoch_lenient(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => {
            let text = s.trim();
            if text.is_empty() {
                return None;
            }
            if text.chars().all(|c| c.is_ascii_digit()) {
                return text.parse().ok();
            }
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.timestamp())
        }
        _ => None,
    }
}

/// Serde adaptor over [`parse_epoch_lenient`]: older writers stored epochs
/// as strings, and an unreadable epoch reads as 0 rather than poisoning the
/// whole document.
pub fn de_epoch_lenient<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(parse_epoch_lenient(&value).unwrap_or(0))
}

/// Parse an RFC 3339 string to epoch seconds.
pub fn parse_iso_to_epoch(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.timestamp())
}
