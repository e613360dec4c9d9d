//! Layer configuration loaded from YAML.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use fourwings_common::{AggregationOperation, Sublayer};
use heatmap_layer::{DEFAULT_DEBOUNCE, DEFAULT_MAX_REQUESTS, DEFAULT_STORE_CAPACITY};
use serde::{Deserialize, Serialize};
use tile_fetcher::{TransportConfig, BASE_API_TILES_URL};
use tracing::debug;

/// Root configuration for one heatmap layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapConfig {
    /// Tile URL templates; one is picked per tile.
    #[serde(default = "default_tiles_urls")]
    pub tiles_urls: Vec<String>,
    #[serde(default)]
    pub aggregation_operation: AggregationOperation,
    pub sublayers: Vec<Sublayer>,
    #[serde(default)]
    pub extent_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tuning: TuningConfig,
    #[serde(default)]
    pub transport: TransportConfig,
}

fn default_tiles_urls() -> Vec<String> {
    vec![BASE_API_TILES_URL.to_string()]
}

/// Scheduling and memory limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub debounce_ms: u64,
    pub max_requests: usize,
    pub store_capacity: usize,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            max_requests: DEFAULT_MAX_REQUESTS,
            store_capacity: DEFAULT_STORE_CAPACITY,
        }
    }
}

impl HeatmapConfig {
    /// Load a layer configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: HeatmapConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(path = %path.display(), sublayers = config.sublayers.len(), "Loaded layer config");
        Ok(config)
    }

    /// Replace the configured templates with a single one.
    pub fn with_tiles_url(mut self, tiles_url: Option<String>) -> Self {
        if let Some(url) = tiles_url {
            self.tiles_urls = vec![url];
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.sublayers.is_empty() {
            bail!("at least one sublayer is required");
        }
        let mut ids = HashSet::new();
        for sublayer in &self.sublayers {
            if !ids.insert(sublayer.id.as_str()) {
                bail!("duplicate sublayer id '{}'", sublayer.id);
            }
            if sublayer.datasets.is_empty() {
                bail!("sublayer '{}' has no datasets", sublayer.id);
            }
        }
        if !self.sublayers.iter().any(|s| s.visible) {
            bail!("no visible sublayer");
        }

        if self.tiles_urls.is_empty() {
            bail!("tiles_urls must not be empty");
        }
        for url in &self.tiles_urls {
            let has_y = url.contains("{y}") || url.contains("{-y}");
            if !url.contains("{z}") || !url.contains("{x}") || !has_y {
                bail!("tiles url '{}' must contain {{z}}, {{x}} and {{y}} placeholders", url);
            }
        }

        if self.tuning.max_requests == 0 {
            bail!("tuning.max_requests must be positive");
        }
        if self.tuning.store_capacity == 0 {
            bail!("tuning.store_capacity must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::temp_config_file;

    const CONFIG: &str = r#"
tiles_urls:
  - "https://tiles.example.org/heatmap/{z}/{x}/{y}"
aggregation_operation: avg
sublayers:
  - id: fishing
    datasets: ["public-global-fishing-effort:v3.0"]
    colorRamp: teal
  - id: presence
    datasets: ["public-global-presence:v3.0"]
    colorRamp: magenta
    filter: "flag in ('ESP')"
    vesselGroups: ["group-a"]
tuning:
  debounce_ms: 250
"#;

    #[test]
    fn test_load_config() {
        let file = temp_config_file(CONFIG).unwrap();
        let config = HeatmapConfig::load(file.path()).unwrap();

        assert_eq!(config.aggregation_operation, AggregationOperation::Avg);
        assert_eq!(config.sublayers.len(), 2);
        assert_eq!(config.sublayers[1].filter.as_deref(), Some("flag in ('ESP')"));
        assert_eq!(config.tuning.debounce_ms, 250);
        assert_eq!(config.tuning.max_requests, 100);
        assert_eq!(config.transport.request_timeout_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_to_public_endpoint() {
        let config: HeatmapConfig = serde_yaml::from_str(
            "sublayers:\n  - id: a\n    datasets: [d]\n    colorRamp: sky\n",
        )
        .unwrap();
        assert_eq!(config.tiles_urls, vec![BASE_API_TILES_URL.to_string()]);
        assert_eq!(config.aggregation_operation, AggregationOperation::Sum);
    }

    #[test]
    fn test_tiles_url_override() {
        let file = temp_config_file(CONFIG).unwrap();
        let config = HeatmapConfig::load(file.path())
            .unwrap()
            .with_tiles_url(Some("http://localhost:8080/{z}/{x}/{-y}".to_string()));
        assert_eq!(config.tiles_urls.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let file = temp_config_file(CONFIG).unwrap();
        let base = HeatmapConfig::load(file.path()).unwrap();

        let mut duplicate = base.clone();
        duplicate.sublayers[1].id = "fishing".to_string();
        assert!(duplicate.validate().is_err());

        let bad_url = base.clone().with_tiles_url(Some("https://tiles.example.org/{z}".to_string()));
        assert!(bad_url.validate().is_err());

        let mut hidden = base.clone();
        hidden.sublayers.iter_mut().for_each(|s| s.visible = false);
        assert!(hidden.validate().is_err());

        let mut no_requests = base;
        no_requests.tuning.max_requests = 0;
        assert!(no_requests.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(HeatmapConfig::load(Path::new("/nonexistent/heatmap.yaml")).is_err());
    }
}
