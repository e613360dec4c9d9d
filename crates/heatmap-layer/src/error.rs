//! Error types for the heatmap layer.

use thiserror::Error;
use tile_fetcher::FetchError;

/// Result type alias using LayerError.
pub type LayerResult<T> = Result<T, LayerError>;

#[derive(Debug, Error)]
pub enum LayerError {
    #[error("Tile fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invalid layer properties: {0}")]
    InvalidProps(String),
}

impl LayerError {
    pub fn invalid_props(msg: impl Into<String>) -> Self {
        Self::InvalidProps(msg.into())
    }
}
