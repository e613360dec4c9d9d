//! Common types and utilities shared across the fourwings heatmap crates.

pub mod bbox;
pub mod chunk;
pub mod error;
pub mod interval;
pub mod sublayer;
pub mod tile;
pub mod time;

pub use bbox::BoundingBox;
pub use chunk::{chunk_for, chunk_for_at, frame_indices, frame_indices_for, time_range_key, Chunk, IntervalFrames};
pub use error::{FourwingsError, FourwingsResult};
pub use interval::{interval_for, Interval, IntervalLimit, IntervalUnit};
pub use sublayer::{AggregationOperation, ColorRampId, Sublayer, VesselGroups};
pub use tile::{latlon_to_tile, tile_to_latlon_bounds, tiles_for_bbox, TileCoord};
pub use time::TimeRange;
