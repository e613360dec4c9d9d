//! Subcommand implementations. Each returns a serializable report.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use fourwings_common::{
    chunk_for_at, frame_indices_for, interval_for, tiles_for_bbox, BoundingBox, Chunk, Interval, IntervalFrames,
    TileCoord, TimeRange,
};
use heatmap_layer::{
    HeatmapLayerState, LayerProps, LayerSnapshot, TileStore, TileStoreStats, ViewportLoad, ViewportSession,
};
use serde::Serialize;
use tile_fetcher::{CancellationToken, TileFetcher};
use tracing::{info, warn};

use crate::config::HeatmapConfig;

/// Interval and chunk for a time range.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkReport {
    pub interval: Interval,
    pub chunk: Chunk,
}

pub fn chunk_report(range: TimeRange, now: DateTime<Utc>) -> ChunkReport {
    ChunkReport {
        interval: interval_for(range.start, range.end),
        chunk: chunk_for_at(range.start, range.end, now),
    }
}

/// Frame window of a time range within its chunk.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FramesReport {
    pub buffered_start: DateTime<Utc>,
    #[serde(flatten)]
    pub frames: IntervalFrames,
    pub time_range_key: String,
}

/// Frames relative to `buffered_start`, or to the range's own chunk.
pub fn frames_report(range: TimeRange, buffered_start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> FramesReport {
    let chunk = chunk_for_at(range.start, range.end, now);
    let buffered_start = buffered_start.unwrap_or(chunk.buffered_start);
    let frames = frame_indices_for(chunk.interval, range.start, range.end, buffered_start);
    FramesReport {
        buffered_start,
        time_range_key: frames.time_range_key(),
        frames,
    }
}

/// Per-tile decode summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSummary {
    pub tile: String,
    pub cells: usize,
    /// Cells with a non-zero value in the current window.
    pub active_cells: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    pub zoom: f64,
    pub tile_zoom: u32,
    pub load: ViewportLoad,
    pub layer: LayerSnapshot,
    /// Domain computed from the loaded tiles, whether or not it was committed.
    pub computed_domain: Vec<f64>,
    pub tiles: Vec<TileSummary>,
    pub store: TileStoreStats,
}

/// Parameters of a render run.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub range: TimeRange,
    pub zoom: f64,
    pub bbox: BoundingBox,
}

/// Tiles covering `bbox` at the zoom the layer fetches for `zoom`.
pub fn viewport_tiles(bbox: &BoundingBox, zoom: f64, max_zoom: u32) -> (u32, Vec<TileCoord>) {
    let tile_zoom = (zoom.round().max(0.0) as u32).min(max_zoom);
    (tile_zoom, tiles_for_bbox(bbox, tile_zoom))
}

/// Load one viewport, wait for the color domain and summarize.
pub async fn render(config: HeatmapConfig, request: RenderRequest, cancel: CancellationToken) -> Result<RenderReport> {
    let now = Utc::now();
    let mut props = LayerProps::new(request.range.start, request.range.end, config.sublayers.clone())
        .with_aggregation(config.aggregation_operation);
    props.extent_start = config.extent_start;
    props.validate()?;

    let state = HeatmapLayerState::new(props, now).with_debounce(Duration::from_millis(config.tuning.debounce_ms));
    let fetcher = TileFetcher::http(&config.transport, config.tiles_urls.clone())?;
    let mut session = ViewportSession::new(state, fetcher, TileStore::new(config.tuning.store_capacity))
        .with_max_requests(config.tuning.max_requests);

    let (tile_zoom, tiles) = viewport_tiles(&request.bbox, request.zoom, session.max_zoom());
    info!(
        tiles = tiles.len(),
        zoom = tile_zoom,
        chunk = %session.state().chunk().id,
        interval = %session.state().chunk().interval,
        "Loading viewport"
    );

    let load = session.load_viewport(&tiles, &cancel).await;
    if load.cancelled > 0 {
        warn!(cancelled = load.cancelled, "Viewport load interrupted");
    } else {
        session.settle(&tiles, request.zoom).await;
    }

    let sample = session.domain_tiles(&tiles, request.zoom);
    let sample_refs: Vec<_> = sample.iter().map(|tile| tile.as_ref()).collect();
    let computed_domain = session.state().compute_color_domain(&sample_refs);

    let mut summaries = Vec::with_capacity(tiles.len());
    for coord in &tiles {
        let Some(decoded) = session.tile(coord) else {
            continue;
        };
        let active_cells = decoded
            .cells
            .iter()
            .filter(|cell| session.state().cell_values(cell).iter().any(|v| *v != 0.0))
            .count();
        summaries.push(TileSummary {
            tile: coord.id(),
            cells: decoded.cells.len(),
            active_cells,
        });
    }

    Ok(RenderReport {
        zoom: request.zoom,
        tile_zoom,
        load,
        layer: session.state().snapshot(),
        computed_domain,
        tiles: summaries,
        store: session.store().stats(),
    })
}
