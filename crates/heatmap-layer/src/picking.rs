//! Hover/click inspection of heatmap cells.

use chrono::{DateTime, Utc};
use fourwings_common::{AggregationOperation, Interval, IntervalFrames, Sublayer, TileCoord};
use fourwings_parser::Cell;
use serde::Serialize;

/// One sublayer's aggregated value at a picked cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickedSublayer {
    pub id: String,
    pub value: f64,
}

/// Result of picking a cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickedCell {
    pub tile: TileCoord,
    pub cell_index: u32,
    pub col: u32,
    pub row: u32,
    pub interval: Interval,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub sublayers: Vec<PickedSublayer>,
}

/// Inspect `cell` over the frame window.
///
/// `sublayers` are the sublayers the tile was decoded with, in order.
/// Returns `None` when no sublayer has a non-zero value.
pub fn pick_cell(
    tile: TileCoord,
    cell: &Cell,
    sublayers: &[&Sublayer],
    frames: &IntervalFrames,
    op: AggregationOperation,
    range: (DateTime<Utc>, DateTime<Utc>),
) -> Option<PickedCell> {
    let values = cell.aggregate(frames.start_frame, frames.end_frame, op);
    let picked: Vec<PickedSublayer> = sublayers
        .iter()
        .zip(values.iter())
        .map(|(sublayer, value)| PickedSublayer {
            id: sublayer.id.clone(),
            value: *value,
        })
        .collect();

    if !picked.iter().any(|s| s.value != 0.0 && !s.value.is_nan()) {
        return None;
    }

    Some(PickedCell {
        tile,
        cell_index: cell.cell_index,
        col: cell.col,
        row: cell.row,
        interval: frames.interval,
        start: range.0,
        end: range.1,
        sublayers: picked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fourwings_common::BoundingBox;
    use fourwings_parser::SparseSeries;
    use test_utils::{fishing_sublayer, presence_sublayer, utc};

    fn frames() -> IntervalFrames {
        IntervalFrames {
            interval: Interval::Day,
            tile_start_frame: 0,
            start_frame: 0,
            end_frame: 10,
        }
    }

    fn cell(series: Vec<Option<SparseSeries>>) -> Cell {
        let mut cell = Cell::new(7, 4, 4, series.len(), &BoundingBox::world());
        cell.series = series;
        cell
    }

    #[test]
    fn test_pick_reports_each_sublayer() {
        let (fishing, presence) = (fishing_sublayer(), presence_sublayer());
        let cell = cell(vec![Some(SparseSeries::new(2, vec![1.0, 2.0])), None]);
        let picked = pick_cell(
            TileCoord::new(0, 0, 0),
            &cell,
            &[&fishing, &presence],
            &frames(),
            AggregationOperation::Sum,
            (utc(2024, 1, 1), utc(2024, 1, 11)),
        )
        .unwrap();

        assert_eq!((picked.cell_index, picked.col, picked.row), (7, 3, 1));
        assert_eq!(
            picked.sublayers,
            vec![
                PickedSublayer { id: "fishing".to_string(), value: 3.0 },
                PickedSublayer { id: "presence".to_string(), value: 0.0 },
            ]
        );
    }

    #[test]
    fn test_pick_without_values_is_none() {
        let fishing = fishing_sublayer();
        // data outside the window
        let cell = cell(vec![Some(SparseSeries::new(20, vec![5.0]))]);
        let picked = pick_cell(
            TileCoord::new(0, 0, 0),
            &cell,
            &[&fishing],
            &frames(),
            AggregationOperation::Sum,
            (utc(2024, 1, 1), utc(2024, 1, 11)),
        );
        assert!(picked.is_none());
    }
}
