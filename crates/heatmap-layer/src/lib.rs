//! Fourwings heatmap layer.
//!
//! Ties the tile fetcher and the color quantization together:
//!
//! - [`cache_key`]: chunk and sublayer identity deciding tile reuse
//! - [`controller`]: the layer state machine (domain, ramps, settle flag)
//! - [`scheduler`]: trailing debounce for domain recomputes
//! - [`tile_store`]: LRU of decoded tiles keyed by cache key
//! - [`picking`]: per-cell inspection
//! - [`session`]: async viewport loading for hosts without their own loop

pub mod cache_key;
pub mod controller;
pub mod error;
pub mod picking;
pub mod scheduler;
pub mod session;
pub mod tile_store;

pub use cache_key::{cache_key, TilesCache};
pub use controller::{HeatmapLayerState, LayerProps, LayerSnapshot};
pub use error::{LayerError, LayerResult};
pub use picking::{pick_cell, PickedCell, PickedSublayer};
pub use scheduler::{Debouncer, DEFAULT_DEBOUNCE};
pub use session::{ViewportLoad, ViewportSession, DEFAULT_MAX_REQUESTS, FOURWINGS_MAX_ZOOM};
pub use tile_store::{TileStore, TileStoreStats, DEFAULT_STORE_CAPACITY};
