use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Knobs shared by every presentation view.
///
/// All fields are optional in the JSON form; missing ones take the values
/// the accidents dashboard has always used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Source table (`.csv`, `.tsv`, `.parquet`).
    pub data_path: PathBuf,
    /// Number of equal-width bins for histograms.
    pub histogram_bins: usize,
    /// Maximum number of distinct map points before sampling kicks in.
    pub geo_sample_cap: usize,
    /// Seed for the map sample.
    pub geo_seed: u64,
    /// How many of the sorted states the initial selection contains.
    pub default_state_count: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/accidents_small.csv"),
            histogram_bins: 30,
            geo_sample_cap: 1000,
            geo_seed: 42,
            default_state_count: 5,
        }
    }
}

impl DashboardConfig {
    /// Read a JSON config file and validate it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.histogram_bins == 0 {
            return Err(ConfigError::Invalid("histogram_bins must be at least 1".into()));
        }
        if self.geo_sample_cap == 0 {
            return Err(ConfigError::Invalid("geo_sample_cap must be at least 1".into()));
        }
        Ok(())
    }
}
