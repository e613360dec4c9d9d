//! Color quantization for 4wings heatmaps.
//!
//! Turns aggregated cell values into an outlier-robust color domain
//! (Ckmeans breakpoints), builds one clamped linear scale per sublayer ramp
//! and resolves the fill color of each cell.

pub mod colors;
pub mod domain;
pub mod error;
pub mod fill;
pub mod scale;
pub mod statistics;

pub use colors::{color_ramp, hex_to_rgb, ColorObject, FillColor, EMPTY_CELL_COLOR};
pub use domain::{
    collect_domain_values, compute_color_domain, get_steps, remove_outliers, COLOR_RAMP_DEFAULT_NUM_STEPS,
};
pub use error::{HeatmapError, HeatmapResult};
pub use fill::{cell_fill_color, dominant_sublayer};
pub use fourwings_parser::{aggregate_cell, aggregate_sublayers};
pub use scale::LinearColorScale;
pub use statistics::{ckmeans, mean, standard_deviation};

/// One scale per sublayer ramp over a shared domain.
pub fn color_scales(domain: &[f64], ranges: &[Vec<ColorObject>]) -> Vec<LinearColorScale> {
    ranges.iter().map(|range| LinearColorScale::new(domain, range)).collect()
}
