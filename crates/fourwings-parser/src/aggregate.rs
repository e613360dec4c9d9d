//! Temporal aggregation of sparse cell series.
//!
//! A series `(start_offset, values)` stores frame `start_offset + i` at
//! `values[i]`. Frames outside `[start_offset, start_offset + len)` are
//! implicitly zero.

use fourwings_common::AggregationOperation;

use crate::cell::SparseSeries;

/// Reduce `values` over the frame window `[start_frame, end_frame)`.
///
/// Returns 0 when the window does not overlap the stored frames.
pub fn aggregate_cell(
    values: &[f64],
    start_offset: i64,
    start_frame: i64,
    end_frame: i64,
    op: AggregationOperation,
) -> f64 {
    let len = values.len() as i64;
    if end_frame < start_offset || start_frame - start_offset >= len {
        return 0.0;
    }
    reduce(slice_values(values, start_offset, start_frame, end_frame), op)
}

/// Aggregate every sublayer of a cell. Absent sublayers contribute 0.
pub fn aggregate_sublayers(
    series: &[Option<SparseSeries>],
    start_frame: i64,
    end_frame: i64,
    op: AggregationOperation,
) -> Vec<f64> {
    series
        .iter()
        .map(|sublayer| match sublayer {
            Some(s) => aggregate_cell(&s.values, s.start_offset, start_frame, end_frame, op),
            None => 0.0,
        })
        .collect()
}

fn slice_values(values: &[f64], start_offset: i64, start_frame: i64, end_frame: i64) -> &[f64] {
    let len = values.len() as i64;
    let from = (start_frame - start_offset).max(0);
    let to = (end_frame - start_offset).min(len);
    if from >= to {
        return &[];
    }
    &values[from as usize..to as usize]
}

fn reduce(values: &[f64], op: AggregationOperation) -> f64 {
    let present = values.iter().copied().filter(|v| !v.is_nan());
    match op {
        AggregationOperation::Sum => present.sum(),
        AggregationOperation::Avg => {
            let (sum, count) = present
                .filter(|v| *v != 0.0)
                .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
            if count == 0 {
                0.0
            } else {
                sum / count as f64
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AggregationOperation::{Avg, Sum};

    #[test]
    fn test_window_before_series_is_zero() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(aggregate_cell(&values, 10, 0, 9, Sum), 0.0);
        assert_eq!(aggregate_cell(&values, 10, 0, 9, Avg), 0.0);
    }

    #[test]
    fn test_window_after_series_is_zero() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(aggregate_cell(&values, 10, 13, 20, Sum), 0.0);
        assert_eq!(aggregate_cell(&values, 10, 13, 20, Avg), 0.0);
    }

    #[test]
    fn test_full_window_sum_and_avg() {
        let values = [0.0, 4.0, 0.0, 6.0];
        assert_eq!(aggregate_cell(&values, 0, 0, 4, Sum), 10.0);
        assert_eq!(aggregate_cell(&values, 0, 0, 4, Avg), 5.0);
    }

    #[test]
    fn test_avg_of_zeros_is_zero() {
        let values = [0.0, 0.0, 0.0];
        let result = aggregate_cell(&values, 0, 0, 3, Avg);
        assert_eq!(result, 0.0);
        assert!(!result.is_nan());
    }

    #[test]
    fn test_partial_overlap_slices_series() {
        // frames 5..=9
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(aggregate_cell(&values, 5, 0, 7, Sum), 3.0);
        assert_eq!(aggregate_cell(&values, 5, 7, 100, Sum), 12.0);
        assert_eq!(aggregate_cell(&values, 5, 6, 8, Sum), 5.0);
        // window ending exactly at the first stored frame is empty
        assert_eq!(aggregate_cell(&values, 5, 0, 5, Sum), 0.0);
    }

    #[test]
    fn test_nan_counts_as_missing() {
        let values = [f64::NAN, 2.0, 4.0];
        assert_eq!(aggregate_cell(&values, 0, 0, 3, Sum), 6.0);
        assert_eq!(aggregate_cell(&values, 0, 0, 3, Avg), 3.0);
    }

    #[test]
    fn test_aggregate_sublayers_with_absent_series() {
        let series = vec![
            Some(SparseSeries::new(2, vec![1.0, 1.0, 1.0])),
            None,
            Some(SparseSeries::new(0, vec![7.0])),
        ];
        assert_eq!(aggregate_sublayers(&series, 0, 10, Sum), vec![3.0, 0.0, 7.0]);
    }
}
