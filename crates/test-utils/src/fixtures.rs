//! Common test fixtures for heatmap tests.
//!
//! Pre-defined sublayers, time windows and response headers that represent
//! common scenarios.

use std::io::Write;

use chrono::{DateTime, TimeZone, Utc};
use fourwings_common::{ColorRampId, Sublayer, TileCoord, VesselGroups};
use tempfile::NamedTempFile;

/// Tiles URL template used across tests.
pub const TILES_URL: &str = "https://gateway.example.org/v3/4wings/tile/heatmap/{z}/{x}/{y}";

/// Midnight UTC of the given date.
pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Fishing presence sublayer with a single dataset.
pub fn fishing_sublayer() -> Sublayer {
    Sublayer::new(
        "fishing",
        vec!["public-global-fishing-effort:v3.0".to_string()],
        ColorRampId::Teal,
    )
}

/// Presence sublayer with a filter and a vessel group list.
pub fn presence_sublayer() -> Sublayer {
    Sublayer::new(
        "presence",
        vec![
            "public-global-presence:v3.0".to_string(),
            "public-global-carriers:v3.0".to_string(),
        ],
        ColorRampId::Magenta,
    )
    .with_filter("flag in ('ESP')")
    .with_vessel_groups(VesselGroups::Many(vec!["group-a".to_string(), "group-b".to_string()]))
}

/// A mid-latitude tile at zoom 2.
pub fn sample_tile() -> TileCoord {
    TileCoord::new(2, 1, 1)
}

/// Common 4wings response metadata headers as `(name, value)` pairs.
pub fn metadata_headers(cols: u32, rows: u32, scale: f64, offset: f64) -> Vec<(String, String)> {
    vec![
        ("X-columns".to_string(), cols.to_string()),
        ("X-rows".to_string(), rows.to_string()),
        ("X-scale".to_string(), scale.to_string()),
        ("X-offset".to_string(), offset.to_string()),
        ("X-empty-value".to_string(), "0".to_string()),
    ]
}

/// `X-bins-0` header carrying quantized bin edges.
pub fn bins_header(bins: &[f64]) -> (String, String) {
    let values = serde_json::Value::from(bins.to_vec());
    ("X-bins-0".to_string(), values.to_string())
}

/// Writes `contents` to a temporary file that lives as long as the handle.
pub fn temp_config_file(contents: &str) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}
