//! Per-cell fill colors.

use crate::colors::{ColorObject, FillColor, EMPTY_CELL_COLOR};
use crate::scale::LinearColorScale;

/// Sublayer with the largest non-empty aggregated value, as `(index, value)`.
///
/// Ties keep the first sublayer.
pub fn dominant_sublayer(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| *v != 0.0 && !v.is_nan())
        .fold(None, |chosen, (i, v)| match chosen {
            Some((_, best)) if v <= best => chosen,
            _ => Some((i, v)),
        })
}

/// Color a cell from its per-sublayer aggregated values.
///
/// The dominant sublayer's scale decides the color. Without a scale for it,
/// the first breakpoint from index 1 that is at least the value (or the
/// last ramp step) picks an entry of the sublayer's ramp.
pub fn cell_fill_color(
    values: &[f64],
    domain: &[f64],
    ranges: &[Vec<ColorObject>],
    scales: &[LinearColorScale],
) -> FillColor {
    if domain.is_empty() || ranges.is_empty() {
        return EMPTY_CELL_COLOR;
    }
    let Some((index, value)) = dominant_sublayer(values) else {
        return EMPTY_CELL_COLOR;
    };

    let color = match scales.get(index) {
        Some(scale) => scale.color(value),
        None => quantized_color(value, domain, ranges, index),
    };
    color.map_or(EMPTY_CELL_COLOR, |c| c.to_fill())
}

fn quantized_color(value: f64, domain: &[f64], ranges: &[Vec<ColorObject>], index: usize) -> Option<ColorObject> {
    let last_step = ranges[0].len().checked_sub(1)?;
    let step = (1..domain.len()).find(|&i| value <= domain[i] || i == last_step)?;
    ranges.get(index)?.get(step).copied()
}
