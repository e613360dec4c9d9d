//! Geographic bounding boxes.

use serde::{Deserialize, Serialize};

use crate::FourwingsError;

/// A geographic bounding box in degrees (lon/lat).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The whole Web Mercator world in degrees.
    pub fn world() -> Self {
        Self::new(-180.0, -85.0511, 180.0, 85.0511)
    }

    /// Parse a "west,south,east,north" string.
    pub fn from_bbox_string(s: &str) -> Result<Self, FourwingsError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(FourwingsError::InvalidBbox(s.to_string()));
        }

        let mut coords = [0.0f64; 4];
        for (slot, part) in coords.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| FourwingsError::InvalidBbox(format!("invalid number '{}'", part)))?;
        }

        let bbox = Self::new(coords[0], coords[1], coords[2], coords[3]);
        if bbox.min_x >= bbox.max_x || bbox.min_y >= bbox.max_y {
            return Err(FourwingsError::InvalidBbox(format!(
                "min must be lower than max: {}",
                s
            )));
        }
        Ok(bbox)
    }

    /// Width of the bounding box in degrees.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in degrees.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}
