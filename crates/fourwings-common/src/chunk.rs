//! Buffered fetch windows ("chunks") and frame indices relative to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interval::{interval_for, Interval};
use crate::time::start_of_day;

/// Number of interval units padded on each side of a chunk.
pub const CHUNKS_BUFFER: i32 = 1;

/// A time-bounded fetch window snapped to interval-unit boundaries.
///
/// Always satisfies `buffered_start <= start <= end <= buffered_end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: String,
    pub interval: Interval,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub buffered_start: DateTime<Utc>,
    pub buffered_end: DateTime<Utc>,
}

impl Chunk {
    /// Whether `[start, end)` still falls strictly inside this chunk.
    pub fn covers(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start > self.start && end < self.end
    }
}

/// Chunk for `[start, end)` using the current wall clock.
pub fn chunk_for(start: DateTime<Utc>, end: DateTime<Utc>) -> Chunk {
    chunk_for_at(start, end, Utc::now())
}

/// Chunk for `[start, end)` with upper bounds clamped to the UTC day of `now`.
pub fn chunk_for_at(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Chunk {
    let interval = interval_for(start, end);
    let Some(limit) = interval.limit() else {
        return Chunk {
            id: "full-time-range".to_string(),
            interval,
            start,
            end,
            buffered_start: start,
            buffered_end: end,
        };
    };
    let unit = limit.unit;

    let today = start_of_day(now);
    let chunk_start = unit.shift(unit.start_of(start), -CHUNKS_BUFFER);
    let buffered_start = unit.shift(chunk_start, -CHUNKS_BUFFER);
    // end of the unit containing `end`, plus the buffer
    let chunk_end = unit.shift(unit.start_of(end), 1 + CHUNKS_BUFFER);
    let buffered_end = unit.shift(chunk_end, CHUNKS_BUFFER);

    let end = chunk_end.min(today);
    let buffered_end = buffered_end.min(today);
    // ranges in the future collapse onto today
    let start = chunk_start.min(end);
    let buffered_start = buffered_start.min(start);

    Chunk {
        id: format!("{}-chunk", unit),
        interval,
        start,
        end,
        buffered_start,
        buffered_end,
    }
}

/// Frame window of a requested range relative to a chunk's buffered start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalFrames {
    pub interval: Interval,
    pub tile_start_frame: i64,
    pub start_frame: i64,
    pub end_frame: i64,
}

impl IntervalFrames {
    /// Cache key of the active frame window.
    pub fn time_range_key(&self) -> String {
        time_range_key(self.start_frame, self.end_frame)
    }
}

/// Convert absolute timestamps to frame indices relative to `buffered_start`.
pub fn frame_indices(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    buffered_start: DateTime<Utc>,
) -> IntervalFrames {
    frame_indices_for(interval_for(start, end), start, end, buffered_start)
}

/// Same as [`frame_indices`] with the interval fixed by the caller.
pub fn frame_indices_for(
    interval: Interval,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    buffered_start: DateTime<Utc>,
) -> IntervalFrames {
    let tile_start_frame = interval.frame(buffered_start).ceil();
    let start_frame = (interval.frame(start) - tile_start_frame).ceil();
    let end_frame = (interval.frame(end) - tile_start_frame).ceil();
    IntervalFrames {
        interval,
        tile_start_frame: tile_start_frame as i64,
        start_frame: start_frame as i64,
        end_frame: end_frame as i64,
    }
}

pub fn time_range_key(start_frame: i64, end_frame: i64) -> String {
    format!("{}-{}", start_frame, end_frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_day_interval_chunk_snaps_to_months() {
        let now = utc(2025, 1, 1);
        let chunk = chunk_for_at(utc(2024, 1, 10), utc(2024, 2, 20), now);
        assert_eq!(chunk.interval, Interval::Day);
        assert_eq!(chunk.id, "month-chunk");
        assert_eq!(chunk.start, utc(2023, 12, 1));
        assert_eq!(chunk.buffered_start, utc(2023, 11, 1));
        assert_eq!(chunk.end, utc(2024, 4, 1));
        assert_eq!(chunk.buffered_end, utc(2024, 5, 1));
    }

    #[test]
    fn test_chunk_clamped_to_today() {
        let now = Utc.with_ymd_and_hms(2024, 2, 25, 13, 0, 0).unwrap();
        let chunk = chunk_for_at(utc(2024, 2, 1), utc(2024, 2, 20), now);
        assert_eq!(chunk.end, utc(2024, 2, 25));
        assert_eq!(chunk.buffered_end, utc(2024, 2, 25));
    }

    #[test]
    fn test_year_interval_returns_full_range() {
        let start = utc(2018, 1, 1);
        let end = utc(2024, 1, 1);
        let chunk = chunk_for_at(start, end, utc(2025, 1, 1));
        assert_eq!(chunk.id, "full-time-range");
        assert_eq!(chunk.interval, Interval::Year);
        assert_eq!((chunk.start, chunk.end), (start, end));
        assert_eq!((chunk.buffered_start, chunk.buffered_end), (start, end));
    }

    #[test]
    fn test_future_range_keeps_ordering() {
        let now = utc(2024, 1, 1);
        let chunk = chunk_for_at(utc(2024, 6, 1), utc(2024, 6, 2), now);
        assert!(chunk.buffered_start <= chunk.start);
        assert!(chunk.start <= chunk.end);
        assert!(chunk.end <= chunk.buffered_end);
        assert!(chunk.buffered_end <= now);
    }

    #[test]
    fn test_frame_indices_relative_to_buffered_start() {
        let buffered_start = utc(2023, 11, 1);
        let frames = frame_indices(utc(2024, 1, 10), utc(2024, 2, 20), buffered_start);
        assert_eq!(frames.interval, Interval::Day);
        // Nov (30) + Dec (31) + 9 days
        assert_eq!(frames.start_frame, 70);
        assert_eq!(frames.end_frame, 70 + 41);
        assert_eq!(frames.time_range_key(), "70-111");
    }

    #[test]
    fn test_frame_indices_round_up_partial_frames() {
        let buffered_start = utc(2024, 1, 1);
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 6, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 20, 18, 0, 0).unwrap();
        let frames = frame_indices(start, end, buffered_start);
        assert_eq!(frames.start_frame, 2);
        assert_eq!(frames.end_frame, 20);
    }

    #[test]
    fn test_covers() {
        let chunk = chunk_for_at(utc(2024, 1, 10), utc(2024, 2, 20), utc(2025, 1, 1));
        assert!(chunk.covers(utc(2024, 1, 5), utc(2024, 3, 1)));
        assert!(!chunk.covers(utc(2023, 12, 1), utc(2024, 3, 1)));
        assert!(!chunk.covers(utc(2024, 1, 5), utc(2024, 4, 1)));
    }
}
