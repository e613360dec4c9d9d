//! Clamped piecewise-linear color scales.

use crate::colors::ColorObject;

/// Maps a numeric domain onto a list of colors by piecewise-linear
/// interpolation, clamping inputs to the domain extent.
///
/// Only the first `min(domain.len(), range.len())` pairs are used.
/// Descending domains are accepted and treated as their mirror image.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearColorScale {
    domain: Vec<f64>,
    range: Vec<ColorObject>,
}

impl LinearColorScale {
    pub fn new(domain: &[f64], range: &[ColorObject]) -> Self {
        let len = domain.len().min(range.len());
        let mut domain = domain[..len].to_vec();
        let mut range = range[..len].to_vec();
        if len > 1 && domain[len - 1] < domain[0] {
            domain.reverse();
            range.reverse();
        }
        Self { domain, range }
    }

    pub fn domain(&self) -> &[f64] {
        &self.domain
    }

    pub fn range(&self) -> &[ColorObject] {
        &self.range
    }

    /// Color for `value`; `None` when the scale has fewer than two stops or
    /// the value is NaN.
    pub fn color(&self, value: f64) -> Option<ColorObject> {
        let n = self.domain.len();
        if n < 2 || value.is_nan() || self.domain[0].is_nan() || self.domain[n - 1].is_nan() {
            return None;
        }

        let value = value.clamp(self.domain[0], self.domain[n - 1]);
        // segment whose upper stop is the first one strictly above `value`
        let upper = self.domain[1..n - 1].partition_point(|d| *d <= value) + 1;
        let (d0, d1) = (self.domain[upper - 1], self.domain[upper]);
        let t = if d1 > d0 { (value - d0) / (d1 - d0) } else { 0.5 };
        Some(self.range[upper - 1].lerp(&self.range[upper], t))
    }
}
