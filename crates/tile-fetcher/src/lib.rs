//! Concurrent retrieval of 4wings tiles.
//!
//! For one tile every visible sublayer is requested in parallel, response
//! headers are merged into [`TileMetadata`] and the payloads are decoded
//! into a single [`fourwings_parser::DecodedTile`].
//!
//! # Example
//!
//! ```ignore
//! use tile_fetcher::{FetchContext, TileFetcher, TransportConfig};
//!
//! let fetcher = TileFetcher::http(&TransportConfig::default(), vec![url])?;
//! let tile = fetcher.fetch_tile(coord, &context, &cancel).await?;
//! ```

pub mod error;
pub mod fetcher;
pub mod headers;
pub mod transport;
pub mod url;

pub use error::{FetchError, FetchResult, DEFAULT_CHUNK_ERROR};
pub use fetcher::{FetchContext, FetchedTile, TileFetcher};
pub use headers::TileMetadata;
pub use transport::{HttpTransport, StaticTransport, TileResponse, TileTransport, TransportConfig};
pub use tokio_util::sync::CancellationToken;
pub use url::{data_url_for_sublayer, date_range, fill_template, select_template, BASE_API_TILES_URL};
