//! Time handling utilities for requested time windows.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::FourwingsError;

/// A requested `[start, end)` time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Parse both ends from ISO 8601 strings, requiring `start < end`.
    pub fn parse(start: &str, end: &str) -> Result<Self, FourwingsError> {
        let start = parse_iso8601(start)?;
        let end = parse_iso8601(end)?;
        if start >= end {
            return Err(FourwingsError::InvalidTimeRange(format!(
                "start {} must be before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt < &self.end
    }
}

/// Parse an ISO 8601 timestamp or date, assuming UTC when no offset is given.
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, FourwingsError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(FourwingsError::InvalidTime(s.to_string()))
}

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .unwrap_or(now)
}

/// Midnight UTC of the day after `now`.
pub fn tomorrow(now: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(now) + Duration::days(1)
}

/// `YYYY-MM-DD` rendering of a UTC timestamp.
pub fn iso_date(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}
