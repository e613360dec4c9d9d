//! Heatmap color ramps.
//!
//! Every ramp is a single base color repeated at increasing opacity, so
//! denser cells read as more saturated.

use fourwings_common::ColorRampId;
use serde::{Deserialize, Serialize};

use crate::domain::COLOR_RAMP_DEFAULT_NUM_STEPS;
use crate::error::{HeatmapError, HeatmapResult};

const MIN_OPACITY: f64 = 0.1;

/// Fill color handed to the renderer, `[r, g, b, a]` with alpha in 0..=255.
pub type FillColor = [u8; 4];

pub const EMPTY_CELL_COLOR: FillColor = [0, 0, 0, 0];

/// Color with float channels; r/g/b in 0..=255, alpha in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorObject {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ColorObject {
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn transparent() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Channel-wise linear interpolation, `t` in 0..=1.
    pub fn lerp(&self, other: &ColorObject, t: f64) -> ColorObject {
        ColorObject {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Convert to a renderer color, scaling alpha to 0..=255.
    pub fn to_fill(&self) -> FillColor {
        let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        [
            channel(self.r),
            channel(self.g),
            channel(self.b),
            channel(self.a * 255.0),
        ]
    }
}

/// Parse `#RRGGBB` (leading `#` optional) into an opaque color.
pub fn hex_to_rgb(hex: &str) -> HeatmapResult<ColorObject> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(HeatmapError::invalid_color(hex));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| HeatmapError::invalid_color(hex))
    };
    Ok(ColorObject::new(
        channel(0..2)? as f64,
        channel(2..4)? as f64,
        channel(4..6)? as f64,
        1.0,
    ))
}

/// Base hex color of a ramp.
pub fn ramp_base_color(id: ColorRampId) -> &'static str {
    match id {
        ColorRampId::Teal => "#00FFBC",
        ColorRampId::Magenta => "#FF64CE",
        ColorRampId::Lilac => "#9CA4FF",
        ColorRampId::Salmon => "#FFAE9B",
        ColorRampId::Sky => "#00EEFF",
        ColorRampId::Red => "#FF6854",
        ColorRampId::Yellow => "#FFEA00",
        ColorRampId::Green => "#A6FF59",
        ColorRampId::Orange => "#FFAA0D",
        ColorRampId::Bathymetry => "#4069a6",
    }
}

/// Opacity of each step: `0.1 + (i + 1) * 0.9 / steps`.
pub fn opacity_steps(num_steps: usize) -> Vec<f64> {
    let step = (1.0 - MIN_OPACITY) / num_steps as f64;
    (0..num_steps).map(|i| MIN_OPACITY + (i + 1) as f64 * step).collect()
}

/// Ramp colors for `id` with the default step count.
pub fn color_ramp(id: ColorRampId) -> Vec<ColorObject> {
    color_ramp_with_steps(id, COLOR_RAMP_DEFAULT_NUM_STEPS)
}

pub fn color_ramp_with_steps(id: ColorRampId, num_steps: usize) -> Vec<ColorObject> {
    // the table only holds valid colors
    let base = hex_to_rgb(ramp_base_color(id)).unwrap_or_else(|_| ColorObject::transparent());
    opacity_steps(num_steps)
        .into_iter()
        .map(|a| ColorObject { a, ..base })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#FF64CE").unwrap(), ColorObject::new(255.0, 100.0, 206.0, 1.0));
        assert_eq!(hex_to_rgb("4069a6").unwrap(), ColorObject::new(64.0, 105.0, 166.0, 1.0));
        assert!(hex_to_rgb("#FFF").is_err());
        assert!(hex_to_rgb("#GG0000").is_err());
    }

    #[test]
    fn test_every_ramp_has_ten_increasing_steps() {
        for id in ColorRampId::ALL {
            let ramp = color_ramp(id);
            assert_eq!(ramp.len(), 10);
            assert!(ramp.windows(2).all(|w| w[0].a < w[1].a));
            assert!((ramp[0].a - 0.19).abs() < 1e-9);
            assert!((ramp[9].a - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_to_fill_scales_alpha() {
        assert_eq!(ColorObject::new(0.0, 255.0, 188.0, 1.0).to_fill(), [0, 255, 188, 255]);
        assert_eq!(ColorObject::new(10.4, 10.6, 0.0, 0.5).to_fill(), [10, 11, 0, 128]);
        assert_eq!(ColorObject::transparent().to_fill(), EMPTY_CELL_COLOR);
    }

    #[test]
    fn test_lerp_midpoint() {
        let a = ColorObject::new(0.0, 0.0, 0.0, 0.0);
        let b = ColorObject::new(100.0, 200.0, 50.0, 1.0);
        assert_eq!(a.lerp(&b, 0.5), ColorObject::new(50.0, 100.0, 25.0, 0.5));
    }
}
