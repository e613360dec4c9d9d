//! Error types for color domain computation.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HeatmapError {
    #[error("cannot split {values} values into {clusters} clusters")]
    InvalidClusterCount { clusters: usize, values: usize },

    #[error("invalid color: {0}")]
    InvalidColor(String),
}

impl HeatmapError {
    pub fn invalid_color(msg: impl Into<String>) -> Self {
        Self::InvalidColor(msg.into())
    }
}

pub type HeatmapResult<T> = std::result::Result<T, HeatmapError>;
