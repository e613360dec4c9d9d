//! Deterministic data generators for heatmap tests and benches.
//!
//! These generators create predictable, verifiable patterns so statistics
//! and quantization results can be checked across runs.

use crate::payload::CellRecord;

/// Creates a dense series of `len` frames where frame `i` holds `i + 1`.
pub fn create_ramp_series(len: usize) -> Vec<f64> {
    (1..=len).map(|v| v as f64).collect()
}

/// Creates `count` activity values with a long tail.
///
/// Roughly one in four values is zero, most are in `[0, 100)` and a few
/// outliers land in the thousands.
pub fn create_activity_values(count: usize, seed: u32) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let hash = simple_hash(i as u32, 0, seed);
            match hash % 20 {
                0..=4 => 0.0,
                19 => 1000.0 + (hash % 9000) as f64,
                _ => (hash % 10_000) as f64 / 100.0,
            }
        })
        .collect()
}

/// Creates sparse cell records over a `cols x rows` grid.
///
/// About a third of the cells carry data; each record covers between one and
/// `max_frames` consecutive frames starting at or after `first_frame`.
pub fn create_cell_records(cols: u32, rows: u32, first_frame: u64, max_frames: u64, seed: u32) -> Vec<CellRecord> {
    let max_frames = max_frames.max(1);
    let mut records = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            let hash = simple_hash(col, row, seed);
            if hash % 3 != 0 {
                continue;
            }
            let len = 1 + (hash as u64 / 3) % max_frames;
            let start = first_frame + (hash as u64 / 7) % max_frames;
            let values = (0..len).map(|i| 1 + (hash as u64 + i * 17) % 50).collect();
            records.push(CellRecord::new((row * cols + col) as u64, start, values));
        }
    }
    records
}

/// Simple deterministic hash for reproducible test data.
pub fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}
