//! Viewport loading on top of the layer state.
//!
//! [`ViewportSession`] owns the controller, the fetcher and the decoded
//! tile store. Tiles are fetched concurrently, but every result is applied
//! to the controller on the session's single update path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fourwings_common::TileCoord;
use fourwings_parser::DecodedTile;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tile_fetcher::TileFetcher;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::controller::{HeatmapLayerState, LayerProps};
use crate::tile_store::TileStore;

/// Default number of tile requests in flight.
pub const DEFAULT_MAX_REQUESTS: usize = 100;

/// Deepest zoom with its own tiles; deeper views reuse these.
pub const FOURWINGS_MAX_ZOOM: u32 = 12;

/// Outcome of one viewport load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportLoad {
    /// Tiles fetched because the store had no entry under the cache key.
    pub requested: usize,
    /// Tiles served from the store.
    pub cached: usize,
    pub loaded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Drives one heatmap layer for a host viewport.
#[derive(Debug)]
pub struct ViewportSession {
    state: HeatmapLayerState,
    fetcher: TileFetcher,
    store: TileStore,
    max_requests: usize,
    max_zoom: u32,
}

impl ViewportSession {
    pub fn new(state: HeatmapLayerState, fetcher: TileFetcher, store: TileStore) -> Self {
        Self {
            state,
            fetcher,
            store,
            max_requests: DEFAULT_MAX_REQUESTS,
            max_zoom: FOURWINGS_MAX_ZOOM,
        }
    }

    pub fn with_max_requests(mut self, max_requests: usize) -> Self {
        self.max_requests = max_requests.max(1);
        self
    }

    pub fn state(&self) -> &HeatmapLayerState {
        &self.state
    }

    pub fn store(&self) -> &TileStore {
        &self.store
    }

    pub fn max_zoom(&self) -> u32 {
        self.max_zoom
    }

    /// Apply new layer properties; see [`HeatmapLayerState::update`].
    pub fn update(&mut self, props: LayerProps, now: DateTime<Utc>) -> bool {
        self.state.update(props, now)
    }

    /// Fetch every tile of the viewport missing from the store.
    ///
    /// Cancelling `cancel` aborts all requests still in flight; those tiles
    /// are counted as cancelled and the domain recompute is not armed.
    #[instrument(skip_all, fields(tiles = tiles.len()))]
    pub async fn load_viewport(&mut self, tiles: &[TileCoord], cancel: &CancellationToken) -> ViewportLoad {
        let key = self.state.cache_key().to_string();
        let missing: Vec<TileCoord> = tiles
            .iter()
            .copied()
            .filter(|tile| !self.store.contains(tile, &key))
            .collect();
        let mut load = ViewportLoad {
            requested: missing.len(),
            cached: tiles.len() - missing.len(),
            ..ViewportLoad::default()
        };

        if !missing.is_empty() {
            self.state.on_tile_request();
        }

        let context = self.state.fetch_context(Utc::now());
        let fetcher = &self.fetcher;
        let context = &context;
        let results: Vec<_> = stream::iter(missing)
            .map(|tile| {
                let token = cancel.child_token();
                async move { (tile, fetcher.fetch_tile(tile, context, &token).await) }
            })
            .buffer_unordered(self.max_requests)
            .collect()
            .await;

        for (tile, result) in results {
            match result {
                Ok(Some(fetched)) => {
                    self.state.on_tile_loaded(&fetched);
                    self.store.insert(tile, &key, Arc::new(fetched.decoded));
                    load.loaded += 1;
                }
                Ok(None) => load.cancelled += 1,
                Err(e) => {
                    self.state.on_tile_error(&e);
                    load.failed += 1;
                }
            }
        }

        if cancel.is_cancelled() {
            debug!(cancelled = load.cancelled, "Viewport load cancelled");
        } else {
            if load.failed == 0 {
                self.state.clear_error();
            }
            self.state.on_viewport_load(Instant::now());
        }
        info!(
            requested = load.requested,
            cached = load.cached,
            loaded = load.loaded,
            failed = load.failed,
            "Viewport loaded"
        );
        load
    }

    /// Stored tile under the current cache key.
    pub fn tile(&mut self, tile: &TileCoord) -> Option<Arc<DecodedTile>> {
        let key = self.state.cache_key().to_string();
        self.store.get(tile, &key)
    }

    /// Decoded tiles sampled for the color domain: visible tiles at the
    /// rounded viewport zoom, plus any at the maximum zoom.
    pub fn domain_tiles(&mut self, tiles: &[TileCoord], zoom: f64) -> Vec<Arc<DecodedTile>> {
        let rounded = zoom.round().max(0.0) as u32;
        let key = self.state.cache_key().to_string();
        let max_zoom = self.max_zoom;
        tiles
            .iter()
            .filter(|tile| tile.z == rounded || tile.z == max_zoom)
            .filter_map(|tile| self.store.get(tile, &key))
            .collect()
    }

    /// Advance timers and run a frame if one is due. Returns whether a frame
    /// ran.
    pub fn tick(&mut self, now: Instant, tiles: &[TileCoord], zoom: f64) -> bool {
        if !self.state.poll(now) {
            return false;
        }
        let sample = self.domain_tiles(tiles, zoom);
        let sample: Vec<&DecodedTile> = sample.iter().map(Arc::as_ref).collect();
        self.state.on_animation_frame(&sample);
        true
    }

    /// Wait for the pending domain recompute and run it.
    pub async fn settle(&mut self, tiles: &[TileCoord], zoom: f64) {
        if let Some(deadline) = self.state.recompute_deadline() {
            tokio::time::sleep_until(deadline).await;
        }
        self.tick(Instant::now(), tiles, zoom);
    }
}
