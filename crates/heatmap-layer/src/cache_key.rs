//! Tile cache identity.
//!
//! Decoded tiles stay valid while the chunk and the sublayer identity are
//! unchanged. The cache key folds both into one string; a tile is
//! re-fetched exactly when the key changes.

use chrono::{DateTime, Utc};
use fourwings_common::{interval_for, Chunk, Interval, Sublayer};
use serde::{Deserialize, Serialize};

/// The chunk fields that decide whether cached tiles can be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TilesCache {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub buffered_start: DateTime<Utc>,
    pub interval: Interval,
}

impl TilesCache {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            start: chunk.start,
            end: chunk.end,
            buffered_start: chunk.buffered_start,
            interval: chunk.interval,
        }
    }

    /// Whether `[start, end)` escapes the chunk or needs another interval.
    pub fn needs_update(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start <= self.start || end >= self.end || interval_for(start, end) != self.interval
    }
}

/// Cache key for the chunk and sublayers.
///
/// Sections are joined with `-`: chunk values (epoch millis and interval),
/// sublayer ids, all datasets, all filters and vessel groups, each joined
/// with `,`. Sublayers without filter are skipped in the filter section;
/// sublayers without vessel groups leave an empty slot.
pub fn cache_key(cache: &TilesCache, sublayers: &[Sublayer]) -> String {
    let chunk = format!(
        "{},{},{},{}",
        cache.start.timestamp_millis(),
        cache.end.timestamp_millis(),
        cache.buffered_start.timestamp_millis(),
        cache.interval
    );
    let ids = sublayers.iter().map(|s| s.id.as_str()).collect::<Vec<_>>().join(",");
    let datasets = sublayers
        .iter()
        .flat_map(|s| s.datasets.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(",");
    let filters = sublayers
        .iter()
        .filter_map(|s| s.filter.as_deref())
        .collect::<Vec<_>>()
        .join(",");
    let vessel_groups = sublayers
        .iter()
        .map(|s| s.vessel_groups.as_ref().map(|g| g.joined()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",");

    [chunk, ids, datasets, filters, vessel_groups].join("-")
}
