//! Human-friendly duration strings (`"30s"`, `"5m"`, `"1h30m"`)

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Parse a duration string
///
/// Accepts bare seconds (`"90"`) or humantime units (`"1h30m"`, `"2h 5min"`).
/// Units are read lowercase, so `"2M"` is two minutes, not two months.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return Err(Error::Config("empty duration".to_string()));
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    humantime::parse_duration(&s)
        .map_err(|e| Error::Config(format!("invalid duration '{input}': {e}")))
}

/// Format a duration for display (`1h 30m`)
pub fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

/// Deserialize a required duration from a string or integer seconds
pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match RawDuration::deserialize(deserializer)? {
        RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
        RawDuration::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

/// Deserialize an optional duration; an empty string means "disabled"
pub fn deserialize_optional<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawDuration>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawDuration::Seconds(secs)) => Ok(Some(Duration::from_secs(secs))),
        Some(RawDuration::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawDuration::Text(text)) => parse_duration(&text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
