//! Loading the configuration and the daily record for a command.

use anyhow::Context;
use chrono::NaiveDate;
use hwf_core::config::{PipelineConfig, SeasonPolicy};
use hwf_core::grid::GridSpec;
use hwf_core::ingest::{infer_grid, read_daily_rows, to_daily_records};
use hwf_core::record::DailyRecord;
use log::info;
use std::fs::File;
use std::io::BufReader;

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub percentile: Option<f64>,
    pub min_grid_cells: Option<usize>,
    pub n_seasonal_clusters: Option<usize>,
    pub n_upgma_subclusters: Option<usize>,
    pub subcluster_family: Option<u32>,
    pub fixed_seasons: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(percentile) = self.percentile {
            config.percentile = percentile;
        }
        if let Some(b) = self.min_grid_cells {
            config.min_grid_cells = b;
        }
        if let Some(k) = self.n_seasonal_clusters {
            config.n_seasonal_clusters = k;
        }
        if let Some(u) = self.n_upgma_subclusters {
            config.n_upgma_subclusters = Some(u);
        }
        if let Some(family) = self.subcluster_family {
            config.subcluster_family = Some(family);
        }
        if self.fixed_seasons {
            config.season_policy = SeasonPolicy::Fixed;
        }
    }
}

/// Inclusive date restriction; `None` leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// Read the TOML configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&str>, overrides: &Overrides) -> anyhow::Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => PipelineConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate().context("Invalid pipeline parameters")?;
    Ok(config)
}

/// Read the daily CSV, restrict it to `window` and place it on the grid.
pub fn load_records(
    path: &str,
    config: &PipelineConfig,
    window: DateWindow,
) -> anyhow::Result<(GridSpec, Vec<DailyRecord>)> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path))?;
    let mut rows = read_daily_rows(BufReader::new(file))
        .with_context(|| format!("Failed to read daily rows from {}", path))?;
    rows.retain(|row| window.contains(row.time));
    if rows.is_empty() {
        anyhow::bail!("{} has no observations in the requested date range", path);
    }

    let grid = match &config.grid {
        Some(grid) => grid.clone(),
        None => infer_grid(&rows).context("Failed to infer the grid from the input coordinates")?,
    };
    info!(
        "Grid {}x{} from ({}, {}) with steps ({}, {})",
        grid.nx, grid.ny, grid.lon_origin, grid.lat_origin, grid.lon_step, grid.lat_step
    );
    let records = to_daily_records(&rows, &grid, config.temperature_unit)
        .with_context(|| format!("Failed to place {} on the grid", path))?;
    Ok((grid, records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = PipelineConfig::default();
        Overrides {
            percentile: Some(95.0),
            n_upgma_subclusters: Some(3),
            fixed_seasons: true,
            ..Overrides::default()
        }
        .apply(&mut config);
        assert_eq!(config.percentile, 95.0);
        assert_eq!(config.n_upgma_subclusters, Some(3));
        assert_eq!(config.season_policy, SeasonPolicy::Fixed);
        assert_eq!(config.min_grid_cells, 100);
    }

    #[test]
    fn test_date_window() {
        let day = |d| NaiveDate::from_ymd_opt(2003, 8, d).unwrap();
        let window = DateWindow {
            from: Some(day(2)),
            to: Some(day(4)),
        };
        assert!(!window.contains(day(1)));
        assert!(window.contains(day(2)));
        assert!(window.contains(day(4)));
        assert!(!window.contains(day(5)));
        assert!(DateWindow::default().contains(day(1)));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let overrides = Overrides {
            percentile: Some(150.0),
            ..Overrides::default()
        };
        assert!(load_config(None, &overrides).is_err());
    }
}
