//! Error types for 4wings decoding.

use thiserror::Error;

/// Errors that can occur while decoding a tile payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("truncated varint at byte {0}")]
    TruncatedVarint(usize),

    #[error("varint too long at byte {0}")]
    VarintOverflow(usize),

    #[error("unsupported protobuf wire type {wire_type} at byte {position}")]
    UnsupportedWireType { wire_type: u8, position: usize },

    #[error("field length {length} exceeds remaining {remaining} bytes")]
    TruncatedField { length: usize, remaining: usize },

    #[error("cell record truncated: cell {cell_index} expects {expected} values, {available} available")]
    TruncatedRecord {
        cell_index: u64,
        expected: usize,
        available: usize,
    },

    #[error("cell {cell_index} has end frame {end} before start frame {start}")]
    InvalidFrameRange { cell_index: u64, start: u64, end: u64 },

    #[error("cell index {cell_index} outside {cols}x{rows} grid")]
    CellOutOfGrid { cell_index: u64, cols: u32, rows: u32 },

    #[error("invalid grid shape {cols}x{rows}")]
    InvalidGrid { cols: u32, rows: u32 },
}

/// Result type for decoding operations.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
