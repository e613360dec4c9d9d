//! Error types for tile retrieval.

use fourwings_parser::ParseError;
use thiserror::Error;

/// Message reported when a tile fails without any status text.
pub const DEFAULT_CHUNK_ERROR: &str = "Error loading chunk";

/// Result type alias using FetchError.
pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    /// Non-success HTTP status other than 404.
    #[error("HTTP {status}: {status_text}")]
    Status { status: u16, status_text: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Decode error: {0}")]
    Decode(#[from] ParseError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header {name}: {value}")]
    InvalidHeader { name: String, value: String },

    /// A tile failed as a whole; carries the message shown to the host.
    #[error("{0}")]
    Tile(String),
}

impl FetchError {
    pub fn status(status: u16, status_text: impl Into<String>) -> Self {
        Self::Status {
            status,
            status_text: status_text.into(),
        }
    }

    pub fn invalid_header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Status text carried by the error, if any.
    pub fn status_text(&self) -> Option<&str> {
        match self {
            FetchError::Status { status_text, .. } if !status_text.is_empty() => Some(status_text),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}
