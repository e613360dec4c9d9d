//! Error types for the fourwings heatmap crates.

use thiserror::Error;

/// Result type alias using FourwingsError.
pub type FourwingsResult<T> = Result<T, FourwingsError>;

/// Primary error type for configuration and time handling.
#[derive(Debug, Error)]
pub enum FourwingsError {
    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Invalid time value: {0}")]
    InvalidTime(String),

    #[error("Unknown interval: {0}")]
    UnknownInterval(String),

    #[error("Unknown color ramp: {0}")]
    UnknownColorRamp(String),

    #[error("Unknown aggregation operation: {0}")]
    UnknownAggregation(String),

    #[error("Invalid BBOX: {0}")]
    InvalidBbox(String),
}
