//! Property-style tests for interval selection and chunk arithmetic.

use chrono::{DateTime, Duration, TimeZone, Utc};
use fourwings_common::{chunk_for, chunk_for_at, frame_indices, interval_for, Interval};

fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

// ============================================================================
// Chunk ordering invariant
// ============================================================================

#[test]
fn test_chunk_ordering_holds_for_many_ranges() {
    let now = Utc.with_ymd_and_hms(2024, 8, 15, 9, 30, 0).unwrap();
    let today = utc(2024, 8, 15);
    let origin = utc(2019, 3, 7);
    let spans = [
        Duration::hours(3),
        Duration::days(1),
        Duration::days(4),
        Duration::days(45),
        Duration::days(120),
        Duration::days(800),
        Duration::days(2000),
    ];

    for step in 0..80 {
        let start = origin + Duration::days(step * 29) + Duration::hours(step % 24);
        for span in spans {
            let end = start + span;
            let chunk = chunk_for_at(start, end, now);
            assert!(chunk.buffered_start <= chunk.start, "{:?}", chunk);
            assert!(chunk.start <= chunk.end, "{:?}", chunk);
            assert!(chunk.end <= chunk.buffered_end, "{:?}", chunk);
            if chunk.interval != Interval::Year {
                assert!(chunk.end <= today, "{:?}", chunk);
                assert!(chunk.buffered_end <= today, "{:?}", chunk);
            }
        }
    }
}

#[test]
fn test_chunk_for_uses_wall_clock() {
    let start = Utc::now() - Duration::days(10);
    let end = Utc::now() - Duration::days(2);
    let chunk = chunk_for(start, end);
    assert!(chunk.buffered_end <= Utc::now());
}

// ============================================================================
// Interval selection
// ============================================================================

#[test]
fn test_quarter_range_resolves_deterministically() {
    let start = utc(2024, 1, 1);
    let end = utc(2024, 4, 1);
    let first = interval_for(start, end);
    for _ in 0..10 {
        assert_eq!(interval_for(start, end), first);
    }
    // 91 days exceeds the hourly budget, so a coarser interval is used
    assert_ne!(first, Interval::Hour);
    assert_eq!(first, Interval::Day);
}

#[test]
fn test_two_day_range_is_hourly() {
    assert_eq!(interval_for(utc(2024, 5, 1), utc(2024, 5, 3)), Interval::Hour);
}

#[test]
fn test_coarser_as_range_widens() {
    let start = utc(2020, 1, 1);
    let mut previous = Interval::Hour;
    for days in [1, 2, 5, 30, 90, 200, 900, 1500, 4000] {
        let interval = interval_for(start, start + Duration::days(days));
        assert!(interval >= previous, "{} days gave {}", days, interval);
        previous = interval;
    }
    assert_eq!(previous, Interval::Year);
}

// ============================================================================
// Frame indices
// ============================================================================

#[test]
fn test_frames_start_near_zero_for_buffered_window() {
    let now = utc(2025, 1, 1);
    let start = utc(2024, 3, 5);
    let end = utc(2024, 3, 7);
    let chunk = chunk_for_at(start, end, now);
    let frames = frame_indices(start, end, chunk.buffered_start);
    assert_eq!(frames.interval, Interval::Hour);
    // two buffer days of hourly frames before the requested start
    assert_eq!(frames.start_frame, 48);
    assert_eq!(frames.end_frame, 96);
}

#[test]
fn test_monthly_frames() {
    let now = utc(2025, 1, 1);
    let start = utc(2022, 3, 1);
    let end = utc(2023, 3, 1);
    let chunk = chunk_for_at(start, end, now);
    assert_eq!(chunk.interval, Interval::Month);
    assert_eq!(chunk.buffered_start, utc(2020, 1, 1));
    let frames = frame_indices(start, end, chunk.buffered_start);
    assert_eq!(frames.start_frame, 26);
    assert_eq!(frames.end_frame, 38);
}
