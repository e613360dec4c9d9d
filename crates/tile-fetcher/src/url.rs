//! Request URLs for sublayer tiles.

use chrono::{DateTime, Utc};
use fourwings_common::time::{iso_date, tomorrow};
use fourwings_common::{Chunk, Interval, Sublayer, TileCoord};
use reqwest::Url;

use crate::error::{FetchError, FetchResult};

/// Default tile endpoint template.
pub const BASE_API_TILES_URL: &str = "https://gateway.api.dev.globalfishingwatch.org/v3/4wings/tile/heatmap/{z}/{x}/{y}";

/// Pick one template from a list, stable per tile.
pub fn select_template<'a>(templates: &'a [String], tile: &TileCoord) -> Option<&'a str> {
    if templates.is_empty() {
        return None;
    }
    let index = string_hash(&tile.id()) as usize % templates.len();
    Some(templates[index].as_str())
}

fn string_hash(s: &str) -> u32 {
    s.encode_utf16()
        .fold(0i32, |acc, c| acc.wrapping_shl(5).wrapping_sub(acc).wrapping_add(c as i32))
        .unsigned_abs()
}

/// Substitute `{z}`, `{x}`, `{y}` and `{-y}` in a tile URL template.
pub fn fill_template(template: &str, tile: &TileCoord) -> String {
    template
        .replace("{z}", &tile.z.to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
        .replace("{-y}", &tile.flipped_y().to_string())
}

/// `[start, end]` of the `date-range` parameter.
///
/// The start is the extent start when it is later than the chunk start,
/// otherwise the buffered start. The end is tomorrow (UTC) when that comes
/// before the chunk end, otherwise the buffered end. The start never
/// exceeds the end.
pub fn date_range(chunk: &Chunk, extent_start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = match extent_start {
        Some(extent) if extent > chunk.start => extent,
        _ => chunk.buffered_start,
    };
    let tomorrow = tomorrow(now);
    let end = if tomorrow < chunk.end { tomorrow } else { chunk.buffered_end };
    (start.min(end), end)
}

/// Full request URL for one sublayer of a tile.
///
/// Array parameters use indexed keys (`datasets[0]=...`). `date-range` is
/// omitted for YEAR chunks, which always cover the full requested range.
pub fn data_url_for_sublayer(
    template: &str,
    tile: &TileCoord,
    chunk: &Chunk,
    sublayer: &Sublayer,
    extent_start: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> FetchResult<Url> {
    let base = fill_template(template, tile);
    let mut url = Url::parse(&base).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", base, e)))?;

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("format", "4WINGS")
            .append_pair("interval", chunk.interval.as_str())
            .append_pair("temporal-aggregation", "false")
            .append_pair("datasets[0]", &sublayer.datasets.join(","));
        if let Some(filter) = sublayer.filter.as_deref().filter(|f| !f.is_empty()) {
            query.append_pair("filters[0]", filter);
        }
        if let Some(group) = sublayer.vessel_groups.as_ref().and_then(|g| g.first()) {
            query.append_pair("vessel-groups[0]", group);
        }
        if chunk.interval != Interval::Year {
            let (start, end) = date_range(chunk, extent_start.or(sublayer.extent_start), now);
            query.append_pair("date-range", &format!("{},{}", iso_date(start), iso_date(end)));
        }
    }

    Ok(url)
}
