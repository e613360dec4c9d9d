//! Decoding synthetic tiles end to end.

use chrono::Duration;
use fourwings_common::{frame_indices_for, AggregationOperation, Interval, TimeRange};
use fourwings_parser::{parse_fourwings, ParseError, ParseOptions};
use test_utils::{assert_approx_eq, create_cell_records, encode_cells, encode_stream, sample_tile, utc, CellRecord};

// ============================================================================
// Helpers
// ============================================================================

fn daily_options() -> ParseOptions {
    ParseOptions {
        cols: 10,
        rows: 5,
        interval: Interval::Day,
        buffered_start: utc(2024, 1, 1),
        tile: sample_tile(),
        ..ParseOptions::default()
    }
}

fn first_frame(options: &ParseOptions) -> u64 {
    Interval::Day.frame(options.buffered_start) as u64
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn test_generated_tile_decodes_every_record() {
    let options = daily_options();
    let records = create_cell_records(10, 5, first_frame(&options), 6, 42);
    let tile = parse_fourwings(&[encode_cells(&records)], &options).unwrap();

    assert_eq!(tile.cells.len(), records.len());
    for (cell, record) in tile.cells.iter().zip(&records) {
        assert_eq!(cell.cell_index as u64, record.cell_index);
        let series = cell.series[0].as_ref().unwrap();
        assert_eq!(series.start_offset as u64, record.start_frame - first_frame(&options));
        assert_eq!(series.values.len(), record.values.len());
    }
}

#[test]
fn test_cells_sorted_across_sublayers() {
    let options = daily_options();
    let base = first_frame(&options);
    let a = encode_cells(&[CellRecord::new(40, base, vec![1]), CellRecord::new(3, base, vec![2])]);
    let b = encode_cells(&[CellRecord::new(17, base + 1, vec![5, 6])]);

    let tile = parse_fourwings(&[a, b], &options).unwrap();
    let indices: Vec<u32> = tile.cells.iter().map(|c| c.cell_index).collect();
    assert_eq!(indices, vec![3, 17, 40]);
    assert!(tile.cell(17).unwrap().series[0].is_none());
}

#[test]
fn test_cell_polygon_lies_inside_tile() {
    let options = daily_options();
    let payload = encode_cells(&[CellRecord::new(0, first_frame(&options), vec![1])]);
    let tile = parse_fourwings(&[payload], &options).unwrap();
    let bounds = sample_tile().bounds();

    let cell = &tile.cells[0];
    assert_eq!((cell.col, cell.row), (0, 0));
    // north-west corner of the tile
    assert_approx_eq!(cell.coordinates[3][0], bounds.min_x, 1e-9);
    assert_approx_eq!(cell.coordinates[3][1], bounds.max_y, 1e-9);
    assert_eq!(cell.coordinates.len(), 5);
}

#[test]
fn test_cell_at_finds_cell_by_position() {
    let options = daily_options();
    let payload = encode_cells(&[CellRecord::new(12, first_frame(&options), vec![1])]);
    let tile = parse_fourwings(&[payload], &options).unwrap();

    let cell = &tile.cells[0];
    let lon = (cell.coordinates[0][0] + cell.coordinates[1][0]) / 2.0;
    let lat = (cell.coordinates[0][1] + cell.coordinates[2][1]) / 2.0;
    assert_eq!(tile.cell_at(lon, lat).map(|c| c.cell_index), Some(12));
    assert!(tile.cell_at(-179.0, -80.0).is_none());
}

// ============================================================================
// Aggregation cache
// ============================================================================

#[test]
fn test_initial_values_match_on_demand_aggregation() {
    let start = utc(2024, 1, 3);
    let end = start + Duration::days(10);
    let options = ParseOptions {
        initial_time_range: Some(TimeRange::new(start, end)),
        aggregation_operation: AggregationOperation::Avg,
        ..daily_options()
    };
    let records = create_cell_records(10, 5, first_frame(&options), 12, 3);
    let tile = parse_fourwings(&[encode_cells(&records)], &options).unwrap();
    let frames = frame_indices_for(Interval::Day, start, end, options.buffered_start);

    for cell in &tile.cells {
        let cached = cell.initial_values.get(&frames.time_range_key()).unwrap();
        let fresh = fourwings_parser::aggregate_sublayers(
            &cell.series,
            frames.start_frame,
            frames.end_frame,
            AggregationOperation::Avg,
        );
        assert_eq!(cached, &fresh);
    }
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_end_before_start_is_rejected() {
    let payload = encode_stream(&[1, 20, 10, 5]);
    assert!(matches!(
        parse_fourwings(&[payload], &daily_options()),
        Err(ParseError::InvalidFrameRange { cell_index: 1, start: 20, end: 10 })
    ));
}

#[test]
fn test_truncated_header_is_rejected() {
    let payload = encode_stream(&[1, 20]);
    assert!(matches!(
        parse_fourwings(&[payload], &daily_options()),
        Err(ParseError::TruncatedRecord { expected: 3, available: 2, .. })
    ));
}

#[test]
fn test_all_empty_sublayers_yield_empty_tile() {
    let empty: Vec<Vec<u8>> = vec![Vec::new(), Vec::new()];
    let tile = parse_fourwings(&empty, &daily_options()).unwrap();
    assert!(tile.is_empty());
    assert_eq!(tile.sublayers, 2);
}
