//! Outlier-robust color domains.
//!
//! A color domain is an ascending list of breakpoints, one per ramp step,
//! derived from the aggregated values of every cell currently on screen.

use fourwings_common::{AggregationOperation, IntervalFrames};
use fourwings_parser::DecodedTile;
use rayon::prelude::*;
use tracing::debug;

use crate::statistics::{ckmeans, mean, standard_deviation};

/// Number of breakpoints in a color domain.
pub const COLOR_RAMP_DEFAULT_NUM_STEPS: usize = 10;

/// Drop empty values (0 and NaN) and anything further than `k` standard
/// deviations from the mean, `k` being 2 for averages and 1 for sums.
pub fn remove_outliers(values: &[f64], op: AggregationOperation) -> Vec<f64> {
    let cleaned: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| *v != 0.0 && !v.is_nan())
        .collect();
    if cleaned.is_empty() {
        return cleaned;
    }

    let mean_value = mean(&cleaned);
    let deviation_scale = match op {
        AggregationOperation::Avg => 2.0,
        AggregationOperation::Sum => 1.0,
    };
    let deviation = standard_deviation(&cleaned) * deviation_scale;
    let (lower, upper) = (mean_value - deviation, mean_value + deviation);

    cleaned.into_iter().filter(|v| *v >= lower && *v <= upper).collect()
}

/// Quantization breakpoints for `values` with the default step count.
pub fn get_steps(values: &[f64]) -> Vec<f64> {
    get_steps_with(values, COLOR_RAMP_DEFAULT_NUM_STEPS)
}

/// Cluster minima of an optimal `min(len, num_steps)`-way clustering.
///
/// Equal adjacent breakpoints are collapsed. A short result is padded with
/// `last + 0.5` at the end, then with `first - 0.1` at the front until it
/// holds `num_steps` entries.
pub fn get_steps_with(values: &[f64], num_steps: usize) -> Vec<f64> {
    if values.is_empty() || num_steps == 0 {
        return Vec::new();
    }

    let clusters = values.len().min(num_steps);
    let Ok(groups) = ckmeans(values, clusters) else {
        return Vec::new();
    };

    let mut steps: Vec<f64> = groups.iter().filter_map(|g| g.first().copied()).collect();
    steps.dedup();

    if steps.len() < num_steps {
        if let Some(last) = steps.last().copied() {
            steps.push(last + 0.5);
        }
        while steps.len() < num_steps {
            let first = steps[0];
            steps.insert(0, first - 0.1);
        }
    }
    steps
}

/// Outlier removal followed by quantization.
pub fn compute_color_domain(values: &[f64], op: AggregationOperation) -> Vec<f64> {
    let filtered = remove_outliers(values, op);
    let steps = get_steps(&filtered);
    debug!(
        values = values.len(),
        kept = filtered.len(),
        steps = steps.len(),
        "Computed color domain"
    );
    steps
}

/// Aggregated values of every cell of `tiles` for the frame window,
/// flattened across sublayers.
///
/// Cached per-cell aggregates are reused when they match the window.
pub fn collect_domain_values(
    tiles: &[&DecodedTile],
    frames: &IntervalFrames,
    op: AggregationOperation,
) -> Vec<f64> {
    tiles
        .par_iter()
        .flat_map_iter(|tile| {
            tile.cells.iter().flat_map(move |cell| {
                cell.aggregate(frames.start_frame, frames.end_frame, op)
                    .into_owned()
            })
        })
        .collect()
}
