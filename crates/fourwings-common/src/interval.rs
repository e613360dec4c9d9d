//! Temporal interval granularities and frame arithmetic.
//!
//! Every interval maps an absolute timestamp to a "frame index". Frames are
//! contiguous within an interval, so a tile's time series can be addressed by
//! integer offsets relative to the start of its fetch window.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::FourwingsError;

const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Temporal resolution of a heatmap request, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Interval {
    Hour,
    Day,
    Month,
    Year,
}

impl Interval {
    /// All intervals ordered from finest to coarsest.
    pub const ORDER: [Interval; 4] = [Interval::Hour, Interval::Day, Interval::Month, Interval::Year];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Hour => "HOUR",
            Interval::Day => "DAY",
            Interval::Month => "MONTH",
            Interval::Year => "YEAR",
        }
    }

    /// Span budget for this interval. `None` for the YEAR catch-all.
    pub fn limit(&self) -> Option<IntervalLimit> {
        match self {
            Interval::Hour => Some(IntervalLimit {
                unit: IntervalUnit::Day,
                value: 3,
            }),
            Interval::Day => Some(IntervalLimit {
                unit: IntervalUnit::Month,
                value: 3,
            }),
            Interval::Month => Some(IntervalLimit {
                unit: IntervalUnit::Year,
                value: 3,
            }),
            Interval::Year => None,
        }
    }

    /// Frame index of `ts` within this interval.
    ///
    /// HOUR and DAY frames are fractional (callers apply `ceil`); MONTH and
    /// YEAR frames are calendar based and always integral.
    pub fn frame(&self, ts: DateTime<Utc>) -> f64 {
        match self {
            Interval::Hour => ts.timestamp_millis() as f64 / MS_PER_HOUR,
            Interval::Day => ts.timestamp_millis() as f64 / MS_PER_DAY,
            Interval::Month => (ts.year() as i64 * 12 + ts.month0() as i64) as f64,
            Interval::Year => ts.year() as f64,
        }
    }

    /// Whether a span of `span_ms` milliseconds fits this interval's budget.
    pub fn accepts_span(&self, span_ms: i64) -> bool {
        match self.limit() {
            Some(limit) => (span_ms as f64 / limit.unit.casual_millis()).round() <= limit.value as f64,
            None => true,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = FourwingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HOUR" => Ok(Interval::Hour),
            "DAY" => Ok(Interval::Day),
            "MONTH" => Ok(Interval::Month),
            "YEAR" => Ok(Interval::Year),
            _ => Err(FourwingsError::UnknownInterval(s.to_string())),
        }
    }
}

/// Calendar unit used both to measure a span and to snap chunk boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Day,
    Month,
    Year,
}

impl IntervalUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalUnit::Day => "day",
            IntervalUnit::Month => "month",
            IntervalUnit::Year => "year",
        }
    }

    /// Casual length of one unit (30-day months, 365-day years).
    pub fn casual_millis(&self) -> f64 {
        match self {
            IntervalUnit::Day => MS_PER_DAY,
            IntervalUnit::Month => 30.0 * MS_PER_DAY,
            IntervalUnit::Year => 365.0 * MS_PER_DAY,
        }
    }

    /// Snap `ts` down to the beginning of its unit.
    pub fn start_of(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let date = match self {
            IntervalUnit::Day => ts.date_naive(),
            IntervalUnit::Month => NaiveDate::from_ymd_opt(ts.year(), ts.month(), 1).unwrap_or(ts.date_naive()),
            IntervalUnit::Year => NaiveDate::from_ymd_opt(ts.year(), 1, 1).unwrap_or(ts.date_naive()),
        };
        date.and_hms_opt(0, 0, 0)
            .map(|ndt| Utc.from_utc_datetime(&ndt))
            .unwrap_or(ts)
    }

    /// Move `ts` by `count` whole units (negative moves backwards).
    pub fn shift(&self, ts: DateTime<Utc>, count: i32) -> DateTime<Utc> {
        let months = match self {
            IntervalUnit::Day => return ts + Duration::days(count as i64),
            IntervalUnit::Month => count,
            IntervalUnit::Year => count * 12,
        };
        let shifted = if months >= 0 {
            ts.checked_add_months(Months::new(months.unsigned_abs()))
        } else {
            ts.checked_sub_months(Months::new(months.unsigned_abs()))
        };
        shifted.unwrap_or(ts)
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maximum span (in `unit`s) an interval may cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalLimit {
    pub unit: IntervalUnit,
    pub value: u32,
}

/// Finest interval whose frame count for `[start, end)` stays within budget.
pub fn interval_for(start: DateTime<Utc>, end: DateTime<Utc>) -> Interval {
    let span_ms = (end - start).num_milliseconds();
    Interval::ORDER
        .into_iter()
        .find(|interval| interval.accepts_span(span_ms))
        .unwrap_or(Interval::Year)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_interval_for_short_ranges() {
        assert_eq!(interval_for(utc(2024, 1, 1), utc(2024, 1, 3)), Interval::Hour);
        assert_eq!(interval_for(utc(2024, 1, 1), utc(2024, 1, 4)), Interval::Hour);
        assert_eq!(interval_for(utc(2024, 1, 1), utc(2024, 1, 5)), Interval::Day);
    }

    #[test]
    fn test_interval_for_long_ranges() {
        // 91 days rounds to 3 casual months
        assert_eq!(interval_for(utc(2024, 1, 1), utc(2024, 4, 1)), Interval::Day);
        assert_eq!(interval_for(utc(2024, 1, 1), utc(2024, 6, 1)), Interval::Month);
        assert_eq!(interval_for(utc(2020, 1, 1), utc(2024, 1, 1)), Interval::Year);
    }

    #[test]
    fn test_frames_are_contiguous() {
        let a = utc(2024, 1, 1);
        assert_eq!(Interval::Day.frame(a + Duration::days(1)) - Interval::Day.frame(a), 1.0);
        assert_eq!(Interval::Hour.frame(a + Duration::hours(5)) - Interval::Hour.frame(a), 5.0);
        assert_eq!(Interval::Month.frame(utc(2024, 1, 1)) + 1.0, Interval::Month.frame(utc(2024, 2, 29)));
        assert_eq!(Interval::Month.frame(utc(2023, 12, 31)) + 1.0, Interval::Month.frame(utc(2024, 1, 1)));
        assert_eq!(Interval::Year.frame(utc(2024, 7, 1)), 2024.0);
    }

    #[test]
    fn test_unit_start_and_shift() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 31, 15, 20, 0).unwrap();
        assert_eq!(IntervalUnit::Day.start_of(ts), utc(2024, 3, 31));
        assert_eq!(IntervalUnit::Month.start_of(ts), utc(2024, 3, 1));
        assert_eq!(IntervalUnit::Year.start_of(ts), utc(2024, 1, 1));

        assert_eq!(IntervalUnit::Month.shift(utc(2024, 3, 1), -1), utc(2024, 2, 1));
        assert_eq!(IntervalUnit::Month.shift(utc(2024, 11, 1), 2), utc(2025, 1, 1));
        assert_eq!(IntervalUnit::Year.shift(utc(2024, 1, 1), -2), utc(2022, 1, 1));
        assert_eq!(IntervalUnit::Day.shift(utc(2024, 3, 1), -1), utc(2024, 2, 29));
    }

    #[test]
    fn test_interval_parse_and_display() {
        assert_eq!("day".parse::<Interval>().unwrap(), Interval::Day);
        assert_eq!(Interval::Month.to_string(), "MONTH");
        assert!("WEEK".parse::<Interval>().is_err());
    }
}
