//! Slippy-map tile coordinates.

use serde::{Deserialize, Serialize};

use crate::BoundingBox;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Spatial identity string, used as part of decoded-tile cache keys.
    pub fn id(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }

    /// Row counted from the bottom (TMS `{-y}` convention).
    pub fn flipped_y(&self) -> u32 {
        (1u32 << self.z) - self.y - 1
    }

    /// Geographic bounds of this tile.
    pub fn bounds(&self) -> BoundingBox {
        tile_to_latlon_bounds(self)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Convert lat/lon to Web Mercator tile coordinates.
pub fn latlon_to_tile(lat: f64, lon: f64, zoom: u32) -> TileCoord {
    let n = 2u32.pow(zoom) as f64;
    let max_index = (n - 1.0).max(0.0);

    let x = ((lon + 180.0) / 360.0 * n).floor().clamp(0.0, max_index) as u32;
    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n)
        .floor()
        .clamp(0.0, max_index) as u32;

    TileCoord { z: zoom, x, y }
}

/// Convert Web Mercator tile coordinates to lat/lon bounds.
pub fn tile_to_latlon_bounds(coord: &TileCoord) -> BoundingBox {
    let n = 2u32.pow(coord.z) as f64;

    let lon_min = coord.x as f64 / n * 360.0 - 180.0;
    let lon_max = (coord.x + 1) as f64 / n * 360.0 - 180.0;

    let lat_max = (std::f64::consts::PI * (1.0 - 2.0 * coord.y as f64 / n))
        .sinh()
        .atan()
        .to_degrees();
    let lat_min = (std::f64::consts::PI * (1.0 - 2.0 * (coord.y + 1) as f64 / n))
        .sinh()
        .atan()
        .to_degrees();

    BoundingBox::new(lon_min, lat_min, lon_max, lat_max)
}

/// All tiles at `zoom` intersecting `bbox`, row by row.
pub fn tiles_for_bbox(bbox: &BoundingBox, zoom: u32) -> Vec<TileCoord> {
    let top_left = latlon_to_tile(bbox.max_y, bbox.min_x, zoom);
    let bottom_right = latlon_to_tile(bbox.min_y, bbox.max_x, zoom);

    let mut tiles = Vec::new();
    for y in top_left.y..=bottom_right.y {
        for x in top_left.x..=bottom_right.x {
            tiles.push(TileCoord::new(zoom, x, y));
        }
    }
    tiles
}
