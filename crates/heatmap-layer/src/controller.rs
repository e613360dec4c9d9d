//! Heatmap layer state: cache identity, color domain and settle tracking.
//!
//! [`HeatmapLayerState`] is a plain state machine. The host feeds it
//! property updates, tile lifecycle events, viewport loads and animation
//! frames; it never performs I/O itself.
//!
//! Color domain lifecycle:
//!
//! 1. The first tile response carrying ten bin edges seeds the domain.
//! 2. Each viewport load (re)arms a trailing debounce.
//! 3. When the debounce fires, the next animation frame recomputes the
//!    domain from the tiles at the active zoom. The result is committed
//!    only if a domain already existed and the new one is not empty.
//! 4. A ramp change clears domain, ranges and scales at once and restores
//!    the previous domain with the new ramps on the next animation frame.

use std::time::Duration;

use chrono::{DateTime, Utc};
use fourwings_common::{
    chunk_for_at, frame_indices_for, AggregationOperation, Chunk, IntervalFrames, Sublayer, TimeRange,
};
use fourwings_parser::{Cell, DecodedTile};
use heatmap::{
    cell_fill_color, collect_domain_values, color_ramp, color_scales, compute_color_domain, ColorObject, FillColor,
    LinearColorScale, COLOR_RAMP_DEFAULT_NUM_STEPS,
};
use serde::{Deserialize, Serialize};
use tile_fetcher::{FetchContext, FetchError, FetchedTile};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache_key::{cache_key, TilesCache};
use crate::error::{LayerError, LayerResult};
use crate::picking::{pick_cell, PickedCell};
use crate::scheduler::Debouncer;

/// Host-controlled layer properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerProps {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub sublayers: Vec<Sublayer>,
    #[serde(default)]
    pub aggregation_operation: AggregationOperation,
    #[serde(default)]
    pub extent_start: Option<DateTime<Utc>>,
}

impl LayerProps {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, sublayers: Vec<Sublayer>) -> Self {
        Self {
            start,
            end,
            sublayers,
            aggregation_operation: AggregationOperation::default(),
            extent_start: None,
        }
    }

    pub fn with_aggregation(mut self, op: AggregationOperation) -> Self {
        self.aggregation_operation = op;
        self
    }

    pub fn validate(&self) -> LayerResult<()> {
        if self.start >= self.end {
            return Err(LayerError::invalid_props(format!(
                "start {} must be before end {}",
                self.start, self.end
            )));
        }
        if self.sublayers.is_empty() {
            return Err(LayerError::invalid_props("at least one sublayer is required"));
        }
        Ok(())
    }

    pub fn visible_sublayers(&self) -> Vec<&Sublayer> {
        self.sublayers.iter().filter(|s| s.visible).collect()
    }

    /// One color ramp per visible sublayer.
    pub fn color_ranges(&self) -> Vec<Vec<ColorObject>> {
        self.sublayers
            .iter()
            .filter(|s| s.visible)
            .map(|s| color_ramp(s.color_ramp))
            .collect()
    }
}

#[derive(Debug, Clone)]
struct PendingRecolor {
    domain: Vec<f64>,
    ranges: Vec<Vec<ColorObject>>,
}

/// Host-facing view of the layer state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSnapshot {
    pub cache_key: String,
    pub tiles_cache: TilesCache,
    pub color_domain: Vec<f64>,
    pub color_ranges: Vec<Vec<FillColor>>,
    pub settled: bool,
    pub error: String,
}

/// Layer controller state.
#[derive(Debug)]
pub struct HeatmapLayerState {
    props: LayerProps,
    chunk: Chunk,
    tiles_cache: TilesCache,
    cache_key: String,
    color_domain: Vec<f64>,
    color_ranges: Vec<Vec<ColorObject>>,
    scales: Vec<LinearColorScale>,
    ramp_dirty: bool,
    error: String,
    initial_bins_load: bool,
    debouncer: Debouncer,
    frame_requested: bool,
    pending_recolor: Option<PendingRecolor>,
}

impl HeatmapLayerState {
    pub fn new(props: LayerProps, now: DateTime<Utc>) -> Self {
        let chunk = chunk_for_at(props.start, props.end, now);
        let tiles_cache = TilesCache::from_chunk(&chunk);
        let cache_key = cache_key(&tiles_cache, &props.sublayers);
        let color_ranges = props.color_ranges();
        Self {
            props,
            chunk,
            tiles_cache,
            cache_key,
            color_domain: Vec::new(),
            color_ranges,
            scales: Vec::new(),
            ramp_dirty: false,
            error: String::new(),
            initial_bins_load: false,
            debouncer: Debouncer::default(),
            frame_requested: false,
            pending_recolor: None,
        }
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debouncer = Debouncer::new(delay);
        self
    }

    /// Apply new properties. Returns `true` when the cache key changed and
    /// every tile must be fetched again.
    pub fn update(&mut self, props: LayerProps, now: DateTime<Utc>) -> bool {
        let new_ranges = props.color_ranges();
        let current_ranges = self
            .pending_recolor
            .as_ref()
            .map_or(&self.color_ranges, |pending| &pending.ranges);
        if *current_ranges != new_ranges {
            // a recolor still waiting for its frame already holds the domain
            let domain = match self.pending_recolor.take() {
                Some(pending) => pending.domain,
                None => std::mem::take(&mut self.color_domain),
            };
            debug!(sublayers = new_ranges.len(), "Color ramps changed");
            self.color_domain.clear();
            self.color_ranges.clear();
            self.scales.clear();
            self.ramp_dirty = true;
            self.pending_recolor = Some(PendingRecolor {
                domain,
                ranges: new_ranges,
            });
        }

        if self.tiles_cache.needs_update(props.start, props.end) {
            self.chunk = chunk_for_at(props.start, props.end, now);
            self.tiles_cache = TilesCache::from_chunk(&self.chunk);
            debug!(chunk = %self.chunk.id, interval = %self.chunk.interval, "Tiles cache recomputed");
        }

        self.props = props;
        let key = cache_key(&self.tiles_cache, &self.props.sublayers);
        let changed = key != self.cache_key;
        self.cache_key = key;
        changed
    }

    pub fn props(&self) -> &LayerProps {
        &self.props
    }

    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    pub fn tiles_cache(&self) -> &TilesCache {
        &self.tiles_cache
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn color_domain(&self) -> &[f64] {
        &self.color_domain
    }

    pub fn color_ranges(&self) -> &[Vec<ColorObject>] {
        &self.color_ranges
    }

    pub fn scales(&self) -> &[LinearColorScale] {
        &self.scales
    }

    /// Last tile error message. Cleared once a viewport loads without failures.
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Whether the color quantization reflects the latest loaded data.
    pub fn is_settled(&self) -> bool {
        !self.ramp_dirty && !self.debouncer.is_pending() && !self.frame_requested && self.pending_recolor.is_none()
    }

    /// Frame window of the current time range within the cached chunk.
    pub fn frames(&self) -> IntervalFrames {
        frame_indices_for(
            self.chunk.interval,
            self.props.start,
            self.props.end,
            self.chunk.buffered_start,
        )
    }

    /// Request parameters for tiles under the current cache key.
    pub fn fetch_context(&self, now: DateTime<Utc>) -> FetchContext {
        FetchContext {
            chunk: self.chunk.clone(),
            sublayers: self.props.sublayers.clone(),
            aggregation_operation: self.props.aggregation_operation,
            initial_time_range: Some(TimeRange::new(self.props.start, self.props.end)),
            extent_start: self.props.extent_start,
            now,
        }
    }

    /// A tile request started.
    pub fn on_tile_request(&mut self) {
        self.ramp_dirty = true;
    }

    /// A tile finished loading. Seeds the domain from the server bins the
    /// first time a full set arrives while no domain exists.
    pub fn on_tile_loaded(&mut self, tile: &FetchedTile) {
        let Some(bins) = &tile.bins else {
            return;
        };
        if self.color_domain.is_empty() && !self.initial_bins_load && bins.len() == COLOR_RAMP_DEFAULT_NUM_STEPS {
            info!(tile = %tile.decoded.tile, "Seeded color domain from tile bins");
            self.scales = color_scales(bins, &self.color_ranges);
            self.color_domain = bins.clone();
            self.initial_bins_load = true;
        }
    }

    /// A tile failed; its message becomes the layer error.
    pub fn on_tile_error(&mut self, error: &FetchError) {
        warn!(error = %error, "Tile error");
        self.error = error.to_string();
    }

    /// Every visible tile loaded without error.
    pub fn clear_error(&mut self) {
        if !self.error.is_empty() {
            debug!(previous = %self.error, "Layer error cleared");
            self.error.clear();
        }
    }

    /// The visible tiles finished loading; (re)arm the domain recompute.
    pub fn on_viewport_load(&mut self, now: Instant) {
        self.debouncer.request(now);
    }

    /// When the pending recompute is due, if any.
    pub fn recompute_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Advance timers. Returns `true` when work waits for an animation frame.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.debouncer.poll(now) {
            self.frame_requested = true;
        }
        self.frame_requested || self.pending_recolor.is_some()
    }

    /// Run work scheduled for this frame. `tiles` are the decoded tiles at
    /// the active zoom.
    pub fn on_animation_frame(&mut self, tiles: &[&DecodedTile]) {
        if let Some(recolor) = self.pending_recolor.take() {
            // bins may have seeded a domain after the ramp change
            let domain = if recolor.domain.is_empty() {
                std::mem::take(&mut self.color_domain)
            } else {
                recolor.domain
            };
            self.scales = color_scales(&domain, &recolor.ranges);
            self.color_domain = domain;
            self.color_ranges = recolor.ranges;
            self.ramp_dirty = false;
        }

        if std::mem::take(&mut self.frame_requested) {
            let domain = self.compute_color_domain(tiles);
            if !self.color_domain.is_empty() && !domain.is_empty() {
                let ranges = self.props.color_ranges();
                info!(steps = domain.len(), tiles = tiles.len(), "Color domain updated");
                self.scales = color_scales(&domain, &ranges);
                self.color_domain = domain;
                self.color_ranges = ranges;
                self.ramp_dirty = false;
            }
        }
    }

    /// Domain for `tiles` over the current window, or the current domain
    /// when they hold no values.
    pub fn compute_color_domain(&self, tiles: &[&DecodedTile]) -> Vec<f64> {
        let op = self.props.aggregation_operation;
        let values = collect_domain_values(tiles, &self.frames(), op);
        if values.is_empty() {
            return self.color_domain.clone();
        }
        compute_color_domain(&values, op)
    }

    /// Aggregated per-sublayer values of a cell for the current window.
    pub fn cell_values(&self, cell: &Cell) -> Vec<f64> {
        let frames = self.frames();
        cell.aggregate(frames.start_frame, frames.end_frame, self.props.aggregation_operation)
            .into_owned()
    }

    pub fn fill_color(&self, cell: &Cell) -> FillColor {
        cell_fill_color(&self.cell_values(cell), &self.color_domain, &self.color_ranges, &self.scales)
    }

    /// Inspect the cell under `(lon, lat)`.
    pub fn pick(&self, tile: &DecodedTile, lon: f64, lat: f64) -> Option<PickedCell> {
        let cell = tile.cell_at(lon, lat)?;
        pick_cell(
            tile.tile,
            cell,
            &self.props.visible_sublayers(),
            &self.frames(),
            self.props.aggregation_operation,
            (self.props.start, self.props.end),
        )
    }

    pub fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot {
            cache_key: self.cache_key.clone(),
            tiles_cache: self.tiles_cache,
            color_domain: self.color_domain.clone(),
            color_ranges: self
                .color_ranges
                .iter()
                .map(|range| range.iter().map(ColorObject::to_fill).collect())
                .collect(),
            settled: self.is_settled(),
            error: self.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{fishing_sublayer, utc};

    fn props() -> LayerProps {
        LayerProps::new(utc(2024, 1, 10), utc(2024, 2, 20), vec![fishing_sublayer()])
    }

    #[test]
    fn test_validate_props() {
        assert!(props().validate().is_ok());
        let mut reversed = props();
        reversed.end = reversed.start;
        assert!(reversed.validate().is_err());
        assert!(LayerProps::new(utc(2024, 1, 1), utc(2024, 2, 1), vec![]).validate().is_err());
    }

    #[test]
    fn test_new_state_is_settled_and_empty() {
        let state = HeatmapLayerState::new(props(), utc(2025, 1, 1));
        assert!(state.is_settled());
        assert!(state.color_domain().is_empty());
        assert_eq!(state.color_ranges().len(), 1);
        assert_eq!(state.error(), "");
    }

    #[test]
    fn test_fetch_context_carries_window() {
        let state = HeatmapLayerState::new(props(), utc(2025, 1, 1));
        let context = state.fetch_context(utc(2025, 1, 1));
        assert_eq!(context.chunk, *state.chunk());
        assert_eq!(
            context.initial_time_range,
            Some(TimeRange::new(utc(2024, 1, 10), utc(2024, 2, 20)))
        );
    }

    #[test]
    fn test_hidden_sublayers_have_no_range() {
        let props = LayerProps::new(
            utc(2024, 1, 10),
            utc(2024, 2, 20),
            vec![fishing_sublayer(), fishing_sublayer().hidden()],
        );
        assert_eq!(props.color_ranges().len(), 1);
    }
}
