//! Time range to backend time predicate conversion.
//!
//! Relative expressions (`now`, `now-1h`) are forwarded to the backend, which
//! evaluates `now()` itself, so a filter must be rebuilt for every request.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimeError {
    #[error("invalid date: {0}")]
    InvalidDate(String),
}

/// One side of a dashboard time range.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawTimePoint")]
pub enum TimePoint {
    /// The literal `now`.
    Now,
    /// Offset text following `now-`, kept verbatim (e.g. `1h`).
    Relative(String),
    Absolute(DateTime<Utc>),
}

/// Wire shapes accepted for a time point: expression strings or epoch millis.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimePoint {
    Text(String),
    EpochMillis(i64),
}

impl TryFrom<RawTimePoint> for TimePoint {
    type Error = TimeError;

    fn try_from(raw: RawTimePoint) -> Result<Self, Self::Error> {
        match raw {
            RawTimePoint::Text(s) => TimePoint::parse(&s),
            RawTimePoint::EpochMillis(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .map(TimePoint::Absolute)
                .ok_or_else(|| TimeError::InvalidDate(ms.to_string())),
        }
    }
}

impl TimePoint {
    /// Parse a time expression as typed into a dashboard time picker.
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let s = s.trim();
        if s == "now" {
            return Ok(TimePoint::Now);
        }
        if let Some(offset) = s.strip_prefix("now-") {
            let offset = offset.trim();
            if offset.is_empty() {
                return Err(TimeError::InvalidDate(s.to_string()));
            }
            return Ok(TimePoint::Relative(offset.to_string()));
        }
        if s.starts_with("now") {
            return Err(TimeError::InvalidDate(s.to_string()));
        }
        parse_date(s)
            .map(TimePoint::Absolute)
            .ok_or_else(|| TimeError::InvalidDate(s.to_string()))
    }
}

/// A dashboard time range.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeRange {
    pub from: TimePoint,
    pub to: TimePoint,
}

impl TimeRange {
    pub fn new(from: TimePoint, to: TimePoint) -> Self {
        Self { from, to }
    }

    /// Range from `now-<offset>` until now.
    pub fn last(offset: &str) -> Self {
        Self::new(TimePoint::Relative(offset.to_string()), TimePoint::Now)
    }
}

/// A time point resolved to backend syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfluxTime {
    Now,
    Offset(String),
    /// Whole seconds since the epoch.
    Epoch(i64),
}

impl fmt::Display for InfluxTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfluxTime::Now => f.write_str("now()"),
            InfluxTime::Offset(offset) => f.write_str(offset),
            InfluxTime::Epoch(secs) => write!(f, "{}s", secs),
        }
    }
}

/// Resolve one time point. Absolute instants are truncated to whole seconds.
pub fn resolve_time(point: &TimePoint) -> InfluxTime {
    match point {
        TimePoint::Now => InfluxTime::Now,
        TimePoint::Relative(offset) => InfluxTime::Offset(offset.clone()),
        TimePoint::Absolute(dt) => InfluxTime::Epoch(dt.timestamp_millis() / 1000),
    }
}

/// Build the `time > ...` predicate for a range.
///
/// Resolved sides are inserted as they are. Only an open-ended range
/// (`to` is now) is anchored with `now() - `.
pub fn time_filter(range: &TimeRange) -> String {
    let from = resolve_time(&range.from);
    let until = resolve_time(&range.to);

    if until == InfluxTime::Now {
        return format!("time > now() - {}", from);
    }

    format!("time > {} and time < {}", from, until)
}

/// Parse an absolute date string.
fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y%m%dT%H%M%S",
    ];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let dt = date.and_hms_opt(0, 0, 0)?;
        return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
    }

    // Bare digits are epoch milliseconds
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok().and_then(|ms| Utc.timestamp_millis_opt(ms).single());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_offset_kept_verbatim() {
        for expr in ["now-1h", "now-15m", "now-7d", "now-90s"] {
            let point = TimePoint::parse(expr).unwrap();
            assert_eq!(resolve_time(&point).to_string(), &expr[4..]);
        }
    }

    #[test]
    fn test_now_marker() {
        assert_eq!(resolve_time(&TimePoint::parse("now").unwrap()), InfluxTime::Now);
        assert_eq!(InfluxTime::Now.to_string(), "now()");
    }

    #[test]
    fn test_absolute_epoch_one_second() {
        let point = TimePoint::Absolute(Utc.timestamp_opt(1, 0).unwrap());
        assert_eq!(resolve_time(&point).to_string(), "1s");
    }

    #[test]
    fn test_absolute_truncates() {
        let point = TimePoint::Absolute(Utc.timestamp_millis_opt(1_999).unwrap());
        assert_eq!(resolve_time(&point), InfluxTime::Epoch(1));
    }

    #[test]
    fn test_relative_filter() {
        let range = TimeRange::new(
            TimePoint::parse("now-1h").unwrap(),
            TimePoint::parse("now").unwrap(),
        );
        assert_eq!(time_filter(&range), "time > now() - 1h");
    }

    #[test]
    fn test_absolute_filter() {
        let range: TimeRange = serde_json::from_str(
            r#"{"from": "1970-01-01T00:00:10Z", "to": "1970-01-01 00:01:00"}"#,
        )
        .unwrap();
        assert_eq!(time_filter(&range), "time > 10s and time < 60s");
    }

    #[test]
    fn test_closed_range_inserts_resolved_sides() {
        let range = TimeRange::new(
            TimePoint::Relative("6h".to_string()),
            TimePoint::Relative("1h".to_string()),
        );
        assert_eq!(time_filter(&range), "time > 6h and time < 1h");
    }

    #[test]
    fn test_absolute_from_until_now() {
        let range = TimeRange::new(TimePoint::Absolute(Utc.timestamp_opt(5, 0).unwrap()), TimePoint::Now);
        assert_eq!(time_filter(&range), "time > now() - 5s");
    }

    #[test]
    fn test_only_now_minus_offsets_accepted() {
        assert!(TimePoint::parse("now+1h").is_err());
        assert!(TimePoint::parse("now-").is_err());
        assert!(TimePoint::parse("nowish").is_err());
        assert_eq!(TimePoint::parse("now-2d").unwrap(), TimePoint::Relative("2d".to_string()));
    }

    #[test]
    fn test_deserialize_epoch_millis() {
        let range: TimeRange = serde_json::from_str(r#"{"from": 2500, "to": "now"}"#).unwrap();
        assert_eq!(range.from, TimePoint::Absolute(Utc.timestamp_millis_opt(2500).unwrap()));
        assert_eq!(range.to, TimePoint::Now);
    }

    #[test]
    fn test_invalid_date_rejected() {
        assert!(TimePoint::parse("yesterday-ish").is_err());
        assert!(serde_json::from_str::<TimeRange>(r#"{"from": "garbage", "to": "now"}"#).is_err());
    }
}
