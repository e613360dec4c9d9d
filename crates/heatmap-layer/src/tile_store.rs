//! LRU store of decoded tiles.
//!
//! Entries are keyed by tile coordinate and cache key, so a cache key
//! change makes every stored tile unreachable without an explicit purge.
//! Stale entries age out through normal LRU eviction.

use std::num::NonZeroUsize;
use std::sync::Arc;

use fourwings_common::TileCoord;
use fourwings_parser::DecodedTile;
use lru::LruCache;
use metrics::{counter, gauge};
use serde::Serialize;

/// Default number of decoded tiles kept in memory.
pub const DEFAULT_STORE_CAPACITY: usize = 512;

type StoreKey = (TileCoord, String);

/// Hit/miss/eviction counters for a [`TileStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TileStoreStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl TileStoreStats {
    /// Hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Content-addressed LRU of decoded tiles.
pub struct TileStore {
    cache: LruCache<StoreKey, Arc<DecodedTile>>,
    stats: TileStoreStats,
}

impl std::fmt::Debug for TileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileStore")
            .field("len", &self.cache.len())
            .field("capacity", &self.cache.cap())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Default for TileStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_CAPACITY)
    }
}

impl TileStore {
    /// Store holding at most `capacity` tiles (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            stats: TileStoreStats::default(),
        }
    }

    /// Look up a tile, refreshing its recency.
    pub fn get(&mut self, tile: &TileCoord, cache_key: &str) -> Option<Arc<DecodedTile>> {
        match self.cache.get(&(*tile, cache_key.to_string())) {
            Some(decoded) => {
                self.stats.hits += 1;
                counter!("fourwings_tile_store_hits_total").increment(1);
                Some(decoded.clone())
            }
            None => {
                self.stats.misses += 1;
                counter!("fourwings_tile_store_misses_total").increment(1);
                None
            }
        }
    }

    /// Whether a tile is stored, without touching recency or stats.
    pub fn contains(&self, tile: &TileCoord, cache_key: &str) -> bool {
        self.cache.contains(&(*tile, cache_key.to_string()))
    }

    pub fn insert(&mut self, tile: TileCoord, cache_key: &str, decoded: Arc<DecodedTile>) {
        let key = (tile, cache_key.to_string());
        if let Some((evicted, _)) = self.cache.push(key.clone(), decoded) {
            if evicted != key {
                self.stats.evictions += 1;
                counter!("fourwings_tile_store_evictions_total").increment(1);
            }
        }
        gauge!("fourwings_tile_store_entries").set(self.cache.len() as f64);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        gauge!("fourwings_tile_store_entries").set(0.0);
    }

    pub fn stats(&self) -> TileStoreStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use fourwings_common::Interval;

    fn decoded(tile: TileCoord) -> Arc<DecodedTile> {
        Arc::new(DecodedTile::empty(tile, Interval::Day, DateTime::<Utc>::default(), 1))
    }

    #[test]
    fn test_hit_and_miss() {
        let mut store = TileStore::new(4);
        let tile = TileCoord::new(1, 0, 0);
        store.insert(tile, "k1", decoded(tile));

        assert!(store.get(&tile, "k1").is_some());
        assert!(store.get(&tile, "k2").is_none());
        assert_eq!(store.stats(), TileStoreStats { hits: 1, misses: 1, evictions: 0 });
        assert_eq!(store.stats().hit_rate(), 50.0);
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let mut store = TileStore::new(2);
        let (a, b, c) = (TileCoord::new(1, 0, 0), TileCoord::new(1, 1, 0), TileCoord::new(1, 0, 1));
        store.insert(a, "k", decoded(a));
        store.insert(b, "k", decoded(b));
        store.get(&a, "k");
        store.insert(c, "k", decoded(c));

        assert!(store.contains(&a, "k"));
        assert!(!store.contains(&b, "k"));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_replacing_is_not_an_eviction() {
        let mut store = TileStore::new(2);
        let a = TileCoord::new(1, 0, 0);
        store.insert(a, "k", decoded(a));
        store.insert(a, "k", decoded(a));
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut store = TileStore::new(0);
        let a = TileCoord::new(0, 0, 0);
        store.insert(a, "k", decoded(a));
        assert_eq!(store.len(), 1);
    }
}
