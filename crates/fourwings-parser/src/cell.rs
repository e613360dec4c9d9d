//! Decoded tile cells and their sparse time series.

use std::borrow::Cow;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use fourwings_common::{time_range_key, AggregationOperation, BoundingBox, Interval, TileCoord};
use serde::{Deserialize, Serialize};

use crate::aggregate::aggregate_sublayers;

/// Values for consecutive frames starting at `start_offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseSeries {
    pub start_offset: i64,
    pub values: Vec<f64>,
}

impl SparseSeries {
    pub fn new(start_offset: i64, values: Vec<f64>) -> Self {
        Self {
            start_offset,
            values,
        }
    }

    /// First frame past the stored values.
    pub fn end_offset(&self) -> i64 {
        self.start_offset + self.values.len() as i64
    }
}

/// One raster grid point of a tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub cell_index: u32,
    pub col: u32,
    pub row: u32,
    /// Closed lon/lat ring of the cell footprint.
    pub coordinates: Vec<[f64; 2]>,
    /// Per sublayer series; `None` when the sublayer has no data here.
    pub series: Vec<Option<SparseSeries>>,
    /// Aggregated values per time-range key, computed with `aggregation`.
    pub initial_values: HashMap<String, Vec<f64>>,
    pub aggregation: AggregationOperation,
}

impl Cell {
    pub fn new(cell_index: u32, cols: u32, rows: u32, sublayers: usize, bounds: &BoundingBox) -> Self {
        let col = cell_index % cols;
        let row = cell_index / cols;
        Self {
            cell_index,
            col,
            row,
            coordinates: cell_polygon(col, row, cols, rows, bounds),
            series: vec![None; sublayers],
            initial_values: HashMap::new(),
            aggregation: AggregationOperation::default(),
        }
    }

    /// Start offset per sublayer (0 for absent sublayers).
    pub fn start_offsets(&self) -> Vec<i64> {
        self.series
            .iter()
            .map(|s| s.as_ref().map_or(0, |s| s.start_offset))
            .collect()
    }

    /// Aggregated values for the frame window, reusing a cached result when
    /// one exists for the same window and operation.
    pub fn aggregate(&self, start_frame: i64, end_frame: i64, op: AggregationOperation) -> Cow<'_, [f64]> {
        if op == self.aggregation {
            if let Some(cached) = self.initial_values.get(&time_range_key(start_frame, end_frame)) {
                return Cow::Borrowed(cached.as_slice());
            }
        }
        Cow::Owned(aggregate_sublayers(&self.series, start_frame, end_frame, op))
    }

    /// Like [`Cell::aggregate`], storing the result for later renders.
    pub fn aggregate_cached(&mut self, start_frame: i64, end_frame: i64, op: AggregationOperation) -> &[f64] {
        if op != self.aggregation {
            self.initial_values.clear();
            self.aggregation = op;
        }
        self.initial_values
            .entry(time_range_key(start_frame, end_frame))
            .or_insert_with(|| aggregate_sublayers(&self.series, start_frame, end_frame, op))
    }

    /// Whether any sublayer holds data.
    pub fn has_data(&self) -> bool {
        self.series.iter().any(Option::is_some)
    }
}

/// Lon/lat ring for a cell, row 0 being the northern edge of the tile.
fn cell_polygon(col: u32, row: u32, cols: u32, rows: u32, bounds: &BoundingBox) -> Vec<[f64; 2]> {
    let cell_width = bounds.width() / cols as f64;
    let cell_height = bounds.height() / rows as f64;

    let min_lon = bounds.min_x + col as f64 * cell_width;
    let max_lon = min_lon + cell_width;
    let max_lat = bounds.max_y - row as f64 * cell_height;
    let min_lat = max_lat - cell_height;

    vec![
        [min_lon, min_lat],
        [max_lon, min_lat],
        [max_lon, max_lat],
        [min_lon, max_lat],
        [min_lon, min_lat],
    ]
}

/// Every cell with data in a tile, ordered by cell index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedTile {
    pub tile: TileCoord,
    pub cols: u32,
    pub rows: u32,
    pub interval: Interval,
    pub buffered_start: DateTime<Utc>,
    pub sublayers: usize,
    pub cells: Vec<Cell>,
}

impl DecodedTile {
    pub fn empty(tile: TileCoord, interval: Interval, buffered_start: DateTime<Utc>, sublayers: usize) -> Self {
        Self {
            tile,
            cols: 0,
            rows: 0,
            interval,
            buffered_start,
            sublayers,
            cells: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, cell_index: u32) -> Option<&Cell> {
        self.cells
            .binary_search_by_key(&cell_index, |c| c.cell_index)
            .ok()
            .map(|i| &self.cells[i])
    }

    /// Cell containing a lon/lat point, if it holds data.
    pub fn cell_at(&self, lon: f64, lat: f64) -> Option<&Cell> {
        if self.cols == 0 || self.rows == 0 {
            return None;
        }
        let bounds = self.tile.bounds();
        if lon < bounds.min_x || lon >= bounds.max_x || lat <= bounds.min_y || lat > bounds.max_y {
            return None;
        }
        let col = ((lon - bounds.min_x) / bounds.width() * self.cols as f64).floor() as u32;
        let row = ((bounds.max_y - lat) / bounds.height() * self.rows as f64).floor() as u32;
        self.cell(row.min(self.rows - 1) * self.cols + col.min(self.cols - 1))
    }
}
