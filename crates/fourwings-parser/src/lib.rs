//! 4wings tile decoding.
//!
//! A 4wings tile body is a protobuf message whose first field is a packed
//! stream of varints. The stream is a sequence of cell records:
//!
//! ```text
//! [cell_index, start_frame, end_frame, value_0, ..., value_(end - start)]
//! ```
//!
//! Frames are absolute interval frames; the decoder rebases them on the
//! chunk's buffered start so every cell keeps a compact
//! `(start_offset, values)` pair instead of a dense timeline.

pub mod aggregate;
pub mod cell;
pub mod error;
pub mod parse;
pub mod pbf;

pub use aggregate::{aggregate_cell, aggregate_sublayers};
pub use cell::{Cell, DecodedTile, SparseSeries};
pub use error::{ParseError, ParseResult};
pub use parse::{parse_fourwings, ParseOptions};
