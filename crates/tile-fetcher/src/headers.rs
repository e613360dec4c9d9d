//! Tile metadata carried in response headers.
//!
//! Every sublayer response may describe the grid and value encoding. The
//! first non-empty value seen for a header wins across all responses of a
//! tile; later responses only fill in what is still missing.

use fourwings_parser::ParseOptions;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, FetchResult};
use crate::transport::TileResponse;

pub const HEADER_COLUMNS: &str = "X-columns";
pub const HEADER_ROWS: &str = "X-rows";
pub const HEADER_SCALE: &str = "X-scale";
pub const HEADER_OFFSET: &str = "X-offset";
pub const HEADER_EMPTY_VALUE: &str = "X-empty-value";
pub const HEADER_BINS: &str = "X-bins-0";

/// Grid and encoding metadata merged from a tile's responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileMetadata {
    pub cols: Option<u32>,
    pub rows: Option<u32>,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
    pub no_data_value: Option<f64>,
    /// Quantized bin edges, as sent by the server.
    pub raw_bins: Option<Vec<f64>>,
}

impl TileMetadata {
    /// Fill missing fields from one response.
    pub fn merge(&mut self, response: &TileResponse) -> FetchResult<()> {
        merge_field(&mut self.cols, response, HEADER_COLUMNS, parse_int)?;
        merge_field(&mut self.rows, response, HEADER_ROWS, parse_int)?;
        merge_field(&mut self.scale, response, HEADER_SCALE, parse_float)?;
        merge_field(&mut self.offset, response, HEADER_OFFSET, parse_float)?;
        merge_field(&mut self.no_data_value, response, HEADER_EMPTY_VALUE, parse_float)?;
        merge_field(&mut self.raw_bins, response, HEADER_BINS, parse_bins)?;
        Ok(())
    }

    pub fn scale(&self) -> f64 {
        self.scale.unwrap_or(1.0)
    }

    pub fn offset(&self) -> f64 {
        self.offset.unwrap_or(0.0)
    }

    /// Bin edges in physical units: `(raw - offset) * scale`.
    pub fn bins(&self) -> Option<Vec<f64>> {
        let (scale, offset) = (self.scale(), self.offset());
        self.raw_bins
            .as_ref()
            .map(|raw| raw.iter().map(|v| (v - offset) * scale).collect())
    }

    /// Decoder options with this metadata applied over `base`.
    pub fn apply(&self, base: ParseOptions) -> ParseOptions {
        ParseOptions {
            cols: self.cols.unwrap_or(base.cols),
            rows: self.rows.unwrap_or(base.rows),
            scale: self.scale.unwrap_or(base.scale),
            offset: self.offset.unwrap_or(base.offset),
            no_data_value: self.no_data_value.unwrap_or(base.no_data_value),
            ..base
        }
    }
}

fn merge_field<T>(
    slot: &mut Option<T>,
    response: &TileResponse,
    name: &str,
    parse: fn(&str, &str) -> FetchResult<T>,
) -> FetchResult<()> {
    if slot.is_some() {
        return Ok(());
    }
    if let Some(value) = response.header(name).map(str::trim).filter(|v| !v.is_empty()) {
        *slot = Some(parse(name, value)?);
    }
    Ok(())
}

fn parse_int(name: &str, value: &str) -> FetchResult<u32> {
    value
        .parse()
        .map_err(|_| FetchError::invalid_header(name, value))
}

fn parse_float(name: &str, value: &str) -> FetchResult<f64> {
    value
        .parse()
        .map_err(|_| FetchError::invalid_header(name, value))
}

/// Bins arrive as a JSON array of integers, possibly string encoded.
fn parse_bins(name: &str, value: &str) -> FetchResult<Vec<f64>> {
    let invalid = || FetchError::invalid_header(name, value);
    let items: Vec<serde_json::Value> = serde_json::from_str(value).map_err(|_| invalid())?;
    items
        .iter()
        .map(|item| match item {
            serde_json::Value::Number(n) => n.as_f64().map(f64::trunc).ok_or_else(invalid),
            serde_json::Value::String(s) => s.trim().parse::<f64>().map(f64::trunc).map_err(|_| invalid()),
            _ => Err(invalid()),
        })
        .collect()
}
