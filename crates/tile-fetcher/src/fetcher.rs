//! Per-tile retrieval of every visible sublayer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fourwings_common::{AggregationOperation, Chunk, Sublayer, TileCoord, TimeRange};
use fourwings_parser::{parse_fourwings, DecodedTile, ParseOptions};
use futures::future::join_all;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::{FetchError, FetchResult, DEFAULT_CHUNK_ERROR};
use crate::headers::TileMetadata;
use crate::transport::{HttpTransport, TileResponse, TileTransport, TransportConfig};
use crate::url::{data_url_for_sublayer, select_template};

/// Everything about the current layer state a tile request depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchContext {
    pub chunk: Chunk,
    pub sublayers: Vec<Sublayer>,
    pub aggregation_operation: AggregationOperation,
    /// Window whose aggregate is precomputed into every decoded cell.
    pub initial_time_range: Option<TimeRange>,
    /// Overrides each sublayer's own extent start for `date-range`.
    pub extent_start: Option<DateTime<Utc>>,
    /// Clock used for the `date-range` upper bound.
    pub now: DateTime<Utc>,
}

impl FetchContext {
    pub fn new(chunk: Chunk, sublayers: Vec<Sublayer>, now: DateTime<Utc>) -> Self {
        Self {
            chunk,
            sublayers,
            aggregation_operation: AggregationOperation::default(),
            initial_time_range: None,
            extent_start: None,
            now,
        }
    }

    pub fn visible_sublayers(&self) -> impl Iterator<Item = &Sublayer> {
        self.sublayers.iter().filter(|s| s.visible)
    }
}

/// A successfully fetched and decoded tile.
#[derive(Debug, Clone)]
pub struct FetchedTile {
    pub decoded: DecodedTile,
    /// De-quantized `X-bins-0` edges, when the server sent them.
    pub bins: Option<Vec<f64>>,
    pub metadata: TileMetadata,
}

/// Fetches and decodes tiles through a [`TileTransport`].
#[derive(Clone)]
pub struct TileFetcher {
    transport: Arc<dyn TileTransport>,
    tiles_urls: Vec<String>,
}

impl std::fmt::Debug for TileFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileFetcher").field("tiles_urls", &self.tiles_urls).finish()
    }
}

impl TileFetcher {
    pub fn new(transport: Arc<dyn TileTransport>, tiles_urls: Vec<String>) -> Self {
        Self { transport, tiles_urls }
    }

    /// Fetcher backed by a reqwest [`HttpTransport`].
    pub fn http(config: &TransportConfig, tiles_urls: Vec<String>) -> FetchResult<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?), tiles_urls))
    }

    pub fn tiles_urls(&self) -> &[String] {
        &self.tiles_urls
    }

    /// Fetch all visible sublayers of `tile` concurrently and decode them.
    ///
    /// Resolves to `Ok(None)` when `cancel` fired before the request started
    /// or while it was in flight. A 404 counts as an empty sublayer. Any
    /// other failed sublayer fails the whole tile with its status text.
    #[instrument(skip(self, context, cancel), fields(tile = %tile))]
    pub async fn fetch_tile(
        &self,
        tile: TileCoord,
        context: &FetchContext,
        cancel: &CancellationToken,
    ) -> FetchResult<Option<FetchedTile>> {
        if cancel.is_cancelled() {
            counter!("fourwings_tile_cancellations_total").increment(1);
            return Ok(None);
        }

        let template = select_template(&self.tiles_urls, &tile)
            .ok_or_else(|| FetchError::InvalidUrl("no tiles url configured".to_string()))?;
        let urls = context
            .visible_sublayers()
            .map(|sublayer| {
                data_url_for_sublayer(template, &tile, &context.chunk, sublayer, context.extent_start, context.now)
            })
            .collect::<FetchResult<Vec<_>>>()?;

        let transport = &self.transport;
        let results = join_all(urls.iter().map(|url| async move {
            let result = transport.get(url.as_str(), cancel).await;
            record_request(&result);
            result
        }))
        .await;

        if cancel.is_cancelled() {
            counter!("fourwings_tile_cancellations_total").increment(1);
            debug!("Tile cancelled while loading");
            return Ok(None);
        }

        let mut metadata = TileMetadata::default();
        let mut buffers = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result.and_then(into_payload) {
                Ok(response) => {
                    metadata.merge(&response)?;
                    buffers.push(response.body);
                }
                Err(FetchError::Cancelled) => buffers.push(Default::default()),
                Err(e) => failures.push(e),
            }
        }

        if let Some(first) = failures.first() {
            counter!("fourwings_tile_failures_total").increment(1);
            warn!(failures = failures.len(), error = %first, "Tile failed to load");
            let message = first.status_text().unwrap_or(DEFAULT_CHUNK_ERROR);
            return Err(FetchError::Tile(message.to_string()));
        }

        let options = metadata.apply(ParseOptions {
            interval: context.chunk.interval,
            buffered_start: context.chunk.buffered_start,
            initial_time_range: context.initial_time_range,
            aggregation_operation: context.aggregation_operation,
            tile,
            ..ParseOptions::default()
        });
        let decoded = parse_fourwings(&buffers, &options)?;
        debug!(cells = decoded.cells.len(), sublayers = decoded.sublayers, "Tile decoded");

        Ok(Some(FetchedTile {
            bins: metadata.bins(),
            decoded,
            metadata,
        }))
    }
}

/// 404 becomes an empty body; other error statuses become failures.
fn into_payload(response: TileResponse) -> FetchResult<TileResponse> {
    if response.is_not_found() {
        Ok(TileResponse::new(404, bytes::Bytes::new()))
    } else if response.is_error() {
        Err(FetchError::status(response.status, response.status_text))
    } else {
        Ok(response)
    }
}

fn record_request(result: &FetchResult<TileResponse>) {
    let class = match result {
        Ok(response) => match response.status {
            200..=299 => "2xx",
            300..=399 => "3xx",
            404 => "404",
            400..=499 => "4xx",
            _ => "5xx",
        },
        Err(FetchError::Cancelled) => "cancelled",
        Err(_) => "error",
    };
    counter!("fourwings_sublayer_requests_total", "status" => class).increment(1);
}
