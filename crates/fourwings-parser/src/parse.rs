//! Cell record decoding and per-tile merging.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fourwings_common::{frame_indices_for, AggregationOperation, Interval, TileCoord, TimeRange};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cell::{Cell, DecodedTile, SparseSeries};
use crate::error::{ParseError, ParseResult};
use crate::pbf::{read_packed_varints, CELLS_FIELD};

pub const DEFAULT_COLS: u32 = 113;
pub const DEFAULT_ROWS: u32 = 53;

/// Grid shape, value transform and time context for decoding one tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOptions {
    pub cols: u32,
    pub rows: u32,
    pub scale: f64,
    pub offset: f64,
    pub no_data_value: f64,
    pub interval: Interval,
    pub buffered_start: DateTime<Utc>,
    /// Range whose aggregate is precomputed into each cell's cache.
    pub initial_time_range: Option<TimeRange>,
    pub aggregation_operation: AggregationOperation,
    pub tile: TileCoord,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
            scale: 1.0,
            offset: 0.0,
            no_data_value: 0.0,
            interval: Interval::Day,
            buffered_start: DateTime::<Utc>::default(),
            initial_time_range: None,
            aggregation_operation: AggregationOperation::Sum,
            tile: TileCoord::new(0, 0, 0),
        }
    }
}

impl ParseOptions {
    fn decode_value(&self, raw: u64) -> f64 {
        let raw = raw as f64;
        if raw == self.no_data_value {
            0.0
        } else {
            (raw - self.offset) * self.scale
        }
    }

    fn tile_start_frame(&self) -> i64 {
        self.interval.frame(self.buffered_start).ceil() as i64
    }
}

/// Decode one payload per sublayer and merge their cells by index.
///
/// Empty payloads (missing sublayers) contribute no cells.
pub fn parse_fourwings<B: AsRef<[u8]>>(buffers: &[B], options: &ParseOptions) -> ParseResult<DecodedTile> {
    if options.cols == 0 || options.rows == 0 {
        return Err(ParseError::InvalidGrid {
            cols: options.cols,
            rows: options.rows,
        });
    }

    let bounds = options.tile.bounds();
    let tile_start_frame = options.tile_start_frame();
    let sublayers = buffers.len();
    let mut cells: BTreeMap<u32, Cell> = BTreeMap::new();

    for (sublayer, buffer) in buffers.iter().enumerate() {
        let buffer = buffer.as_ref();
        if buffer.is_empty() {
            continue;
        }
        let stream = read_packed_varints(buffer, CELLS_FIELD)?;
        let records = decode_records(&stream, options, tile_start_frame)?;
        debug!(
            tile = %options.tile,
            sublayer,
            bytes = buffer.len(),
            cells = records.len(),
            "Decoded sublayer payload"
        );
        for (cell_index, series) in records {
            cells
                .entry(cell_index)
                .or_insert_with(|| Cell::new(cell_index, options.cols, options.rows, sublayers, &bounds))
                .series[sublayer] = Some(series);
        }
    }

    let mut cells: Vec<Cell> = cells.into_values().collect();

    if let Some(range) = &options.initial_time_range {
        let frames = frame_indices_for(options.interval, range.start, range.end, options.buffered_start);
        for cell in &mut cells {
            cell.aggregate_cached(frames.start_frame, frames.end_frame, options.aggregation_operation);
        }
    }

    Ok(DecodedTile {
        tile: options.tile,
        cols: options.cols,
        rows: options.rows,
        interval: options.interval,
        buffered_start: options.buffered_start,
        sublayers,
        cells,
    })
}

/// Split an integer stream into `(cell_index, series)` records.
fn decode_records(
    stream: &[u64],
    options: &ParseOptions,
    tile_start_frame: i64,
) -> ParseResult<Vec<(u32, SparseSeries)>> {
    let cell_count = options.cols as u64 * options.rows as u64;
    let mut records = Vec::new();
    let mut pos = 0;

    while pos < stream.len() {
        let header = &stream[pos..];
        let [cell_index, start, end] = match header {
            [a, b, c, ..] => [*a, *b, *c],
            _ => {
                return Err(ParseError::TruncatedRecord {
                    cell_index: header[0],
                    expected: 3,
                    available: header.len(),
                })
            }
        };
        if end < start {
            return Err(ParseError::InvalidFrameRange { cell_index, start, end });
        }
        let out_of_grid = ParseError::CellOutOfGrid {
            cell_index,
            cols: options.cols,
            rows: options.rows,
        };
        let index = match u32::try_from(cell_index) {
            Ok(index) if cell_index < cell_count => index,
            _ => return Err(out_of_grid),
        };

        let invalid_range = ParseError::InvalidFrameRange { cell_index, start, end };
        let expected = end
            .checked_sub(start)
            .and_then(|span| span.checked_add(1))
            .and_then(|count| usize::try_from(count).ok())
            .ok_or_else(|| invalid_range.clone())?;
        let first_frame = i64::try_from(start)
            .ok()
            .and_then(|start| start.checked_sub(tile_start_frame))
            .ok_or(invalid_range)?;
        let values = &stream[pos + 3..];
        if values.len() < expected {
            return Err(ParseError::TruncatedRecord {
                cell_index,
                expected,
                available: values.len(),
            });
        }

        let series = SparseSeries::new(
            first_frame,
            values[..expected].iter().map(|raw| options.decode_value(*raw)).collect(),
        );
        records.push((index, series));
        pos += 3 + expected;
    }

    Ok(records)
}
