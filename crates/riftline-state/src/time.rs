//! Timestamp codec.
//!
//! Inbound events carry ISO-8601 strings; histories are scored by epoch
//! seconds; the read path renders epochs back to ISO-8601 UTC, and streak
//! labels use a plain `YYYY-MM-DD HH:MM:SS` rendering.

use chrono::{DateTime, NaiveDateTime};

use crate::StateError;

/// Parse an ISO-8601 timestamp into epoch seconds.
///
/// Accepts both offset-carrying (RFC 3339) and naive forms; naive
/// timestamps are taken as UTC. Millisecond precision is preserved.
pub fn to_epoch(timestamp: &str) -> Result<f64, StateError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Ok(dt.timestamp_millis() as f64 / 1000.0);
    }
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().timestamp_millis() as f64 / 1000.0)
        .map_err(|_| StateError::InvalidTimestamp(timestamp.to_string()))
}

/// Render epoch seconds as an ISO-8601 UTC timestamp.
pub fn from_epoch(epoch: f64) -> Result<String, StateError> {
    let millis = (epoch * 1000.0).round() as i64;
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .ok_or_else(|| StateError::InvalidTimestamp(epoch.to_string()))
}

/// Render epoch seconds as `YYYY-MM-DD HH:MM:SS` in UTC, the form used in
/// streak labels. Sub-second precision is truncated.
pub fn label_time(epoch: f64) -> String {
    match DateTime::from_timestamp(epoch.floor() as i64, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => epoch.to_string(),
    }
}
