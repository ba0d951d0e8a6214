//! Pipeline parameters.
//!
//! All fields have defaults, so a TOML file only needs the values it
//! changes:
//!
//! ```toml
//! percentile = 97.5
//! min_grid_cells = 50
//! season_policy = "fixed"
//! n_upgma_subclusters = 3
//! ```

use crate::error::{HeatwaveError, Result};
use crate::grid::GridSpec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest usable `edge_batch_cap`: one event and its 3x3 neighbourhood.
pub const MIN_EDGE_BATCH_CAP: usize = 9;

/// What to do with day-of-year 366 (December 31st of leap years).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeapDayPolicy {
    /// Pool day-366 samples with day 365 and evaluate them against day 365's threshold.
    #[default]
    FoldInto365,
    /// Remove day-366 records from threshold estimation and extraction.
    Drop,
}

/// How heatwaves are grouped into seasonal families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonPolicy {
    /// Fixed meteorological seasons on day-of-year ranges.
    Fixed,
    /// k-means on the circular day-of-year embedding.
    #[default]
    Learned,
}

/// Unit of the input temperature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Kelvin,
}

impl TemperatureUnit {
    pub fn to_celsius(&self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Kelvin => value - 273.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Percentile of the pooled window sample used as the extreme threshold.
    pub percentile: f64,
    /// Width of the calendar window pooled around each day (odd).
    pub window_days: u32,
    /// Smallest pool a threshold may be estimated from.
    pub min_samples: usize,
    pub leap_day: LeapDayPolicy,
    /// A heatwave must last strictly longer than this many days.
    pub min_timespan: u32,
    /// A heatwave must cover strictly more than this many grid cells (`b`).
    pub min_grid_cells: usize,
    pub season_policy: SeasonPolicy,
    /// `k` for the learned season policy.
    pub n_seasonal_clusters: usize,
    pub kmeans_seed: u64,
    pub kmeans_restarts: usize,
    pub kmeans_max_iter: usize,
    /// `u`, the number of UPGMA sub-clusters per family. `None` skips sub-clustering.
    pub n_upgma_subclusters: Option<usize>,
    /// Restrict sub-clustering to one family.
    pub subcluster_family: Option<u32>,
    /// Upper bound on adjacency edges held in memory at once. At least 9, the
    /// most edges a single source event can produce.
    pub edge_batch_cap: usize,
    pub temperature_unit: TemperatureUnit,
    /// Explicit lattice; inferred from the input coordinates when absent.
    pub grid: Option<GridSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            percentile: 99.0,
            window_days: 31,
            min_samples: 30,
            leap_day: LeapDayPolicy::default(),
            min_timespan: 1,
            min_grid_cells: 100,
            season_policy: SeasonPolicy::default(),
            n_seasonal_clusters: 4,
            kmeans_seed: 100,
            kmeans_restarts: 10,
            kmeans_max_iter: 300,
            n_upgma_subclusters: None,
            subcluster_family: None,
            edge_batch_cap: 10_000_000,
            temperature_unit: TemperatureUnit::default(),
            grid: None,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(s).map_err(|e| HeatwaveError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        PipelineConfig::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.percentile) {
            return Err(HeatwaveError::InvalidConfig(format!(
                "percentile must be within [0, 100], got {}",
                self.percentile
            )));
        }
        if self.window_days == 0 || self.window_days > 365 || self.window_days % 2 == 0 {
            return Err(HeatwaveError::InvalidConfig(format!(
                "window_days must be odd and within 1..=365, got {}",
                self.window_days
            )));
        }
        if self.min_samples == 0 {
            return Err(HeatwaveError::InvalidConfig(
                "min_samples must be at least 1".to_string(),
            ));
        }
        if self.season_policy == SeasonPolicy::Learned && self.n_seasonal_clusters == 0 {
            return Err(HeatwaveError::InvalidConfig(
                "n_seasonal_clusters must be at least 1".to_string(),
            ));
        }
        if self.kmeans_restarts == 0 || self.kmeans_max_iter == 0 {
            return Err(HeatwaveError::InvalidConfig(
                "kmeans_restarts and kmeans_max_iter must be at least 1".to_string(),
            ));
        }
        if self.n_upgma_subclusters == Some(0) {
            return Err(HeatwaveError::InvalidConfig(
                "n_upgma_subclusters must be at least 1".to_string(),
            ));
        }
        if self.edge_batch_cap < MIN_EDGE_BATCH_CAP {
            return Err(HeatwaveError::InvalidConfig(format!(
                "edge_batch_cap must be at least {}, got {}",
                MIN_EDGE_BATCH_CAP, self.edge_batch_cap
            )));
        }
        if let Some(grid) = &self.grid {
            grid.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.percentile, 99.0);
        assert_eq!(config.window_days, 31);
        assert_eq!(config.min_grid_cells, 100);
        assert_eq!(config.leap_day, LeapDayPolicy::FoldInto365);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            percentile = 97.5
            season_policy = "fixed"
            leap_day = "drop"
            n_upgma_subclusters = 3
            temperature_unit = "kelvin"
            "#,
        )
        .unwrap();
        assert_eq!(config.percentile, 97.5);
        assert_eq!(config.season_policy, SeasonPolicy::Fixed);
        assert_eq!(config.leap_day, LeapDayPolicy::Drop);
        assert_eq!(config.n_upgma_subclusters, Some(3));
        assert_eq!(config.temperature_unit, TemperatureUnit::Kelvin);
        assert_eq!(config.window_days, 31);
        assert_eq!(config.edge_batch_cap, 10_000_000);
    }

    #[test]
    fn test_explicit_grid() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [grid]
            lon_origin = -15.0
            lat_origin = 35.0
            lon_step = 0.25
            lat_step = 0.25
            nx = 601
            ny = 41
            "#,
        )
        .unwrap();
        let grid = config.grid.unwrap();
        assert_eq!(grid.nx, 601);
        assert_eq!(grid.n_cells(), 601 * 41);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(PipelineConfig::from_toml_str("percentile = 120.0").is_err());
        assert!(PipelineConfig::from_toml_str("window_days = 30").is_err());
        assert!(PipelineConfig::from_toml_str("edge_batch_cap = 0").is_err());
        assert!(PipelineConfig::from_toml_str("edge_batch_cap = 8").is_err());
        assert!(PipelineConfig::from_toml_str("edge_batch_cap = 9").is_ok());
        assert!(PipelineConfig::from_toml_str("n_upgma_subclusters = 0").is_err());
        assert!(PipelineConfig::from_toml_str("season_policy = \"weekly\"").is_err());
    }

    #[test]
    fn test_kelvin_conversion() {
        assert!((TemperatureUnit::Kelvin.to_celsius(300.15) - 27.0).abs() < 1e-9);
        assert_eq!(TemperatureUnit::Celsius.to_celsius(27.0), 27.0);
    }
}
