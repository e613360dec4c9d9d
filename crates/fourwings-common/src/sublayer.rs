//! Sublayer configuration: one independently colored, filterable data series.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::FourwingsError;

/// Reduction applied to a cell's values over the active frame window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationOperation {
    #[default]
    Sum,
    Avg,
}

impl AggregationOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationOperation::Sum => "sum",
            AggregationOperation::Avg => "avg",
        }
    }
}

impl fmt::Display for AggregationOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationOperation {
    type Err = FourwingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregationOperation::Sum),
            "avg" => Ok(AggregationOperation::Avg),
            _ => Err(FourwingsError::UnknownAggregation(s.to_string())),
        }
    }
}

/// Named heatmap color ramps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorRampId {
    Teal,
    Magenta,
    Lilac,
    Salmon,
    Sky,
    Red,
    Yellow,
    Green,
    Orange,
    Bathymetry,
}

impl ColorRampId {
    pub const ALL: [ColorRampId; 10] = [
        ColorRampId::Teal,
        ColorRampId::Magenta,
        ColorRampId::Lilac,
        ColorRampId::Salmon,
        ColorRampId::Sky,
        ColorRampId::Red,
        ColorRampId::Yellow,
        ColorRampId::Green,
        ColorRampId::Orange,
        ColorRampId::Bathymetry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorRampId::Teal => "teal",
            ColorRampId::Magenta => "magenta",
            ColorRampId::Lilac => "lilac",
            ColorRampId::Salmon => "salmon",
            ColorRampId::Sky => "sky",
            ColorRampId::Red => "red",
            ColorRampId::Yellow => "yellow",
            ColorRampId::Green => "green",
            ColorRampId::Orange => "orange",
            ColorRampId::Bathymetry => "bathymetry",
        }
    }
}

impl FromStr for ColorRampId {
    type Err = FourwingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColorRampId::ALL
            .into_iter()
            .find(|ramp| ramp.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| FourwingsError::UnknownColorRamp(s.to_string()))
    }
}

/// Vessel group filter, given either as a single id or a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VesselGroups {
    One(String),
    Many(Vec<String>),
}

impl VesselGroups {
    /// The group sent to the tile API (only one is supported per request).
    pub fn first(&self) -> Option<&str> {
        match self {
            VesselGroups::One(group) => Some(group.as_str()),
            VesselGroups::Many(groups) => groups.first().map(String::as_str),
        }
    }

    /// Comma-joined representation used in cache keys.
    pub fn joined(&self) -> String {
        match self {
            VesselGroups::One(group) => group.clone(),
            VesselGroups::Many(groups) => groups.join(","),
        }
    }
}

/// A named data series configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sublayer {
    pub id: String,
    pub datasets: Vec<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub color: String,
    pub color_ramp: ColorRampId,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub vessel_groups: Option<VesselGroups>,
    #[serde(default)]
    pub extent_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub extent_end: Option<DateTime<Utc>>,
}

fn default_visible() -> bool {
    true
}

impl Sublayer {
    pub fn new(id: impl Into<String>, datasets: Vec<String>, color_ramp: ColorRampId) -> Self {
        Self {
            id: id.into(),
            datasets,
            visible: true,
            color: String::new(),
            color_ramp,
            filter: None,
            vessel_groups: None,
            extent_start: None,
            extent_end: None,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_vessel_groups(mut self, groups: VesselGroups) -> Self {
        self.vessel_groups = Some(groups);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}
