//! Climatological extreme thresholds per grid cell and calendar day.
//!
//! For day `d` the pool is every sample of the same cell whose day of year
//! lies in a window of `window_days` centred on `d`, wrapping across the year
//! boundary, across all years. The threshold is the configured percentile of
//! that pool. Every year is pooled, including the one being evaluated.

use hwf_core::config::{LeapDayPolicy, PipelineConfig};
use hwf_core::error::{HeatwaveError, Result};
use hwf_core::grid::GridCell;
use hwf_core::record::DailyRecord;
use hwf_utils::dates::{circular_window, DAYS_PER_YEAR, LEAP_DAY_OF_YEAR};
use hwf_utils::stats::percentile_sorted;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// One estimated threshold, as written to the thresholds table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThresholdRow {
    pub g_id: u32,
    pub x: u32,
    pub y: u32,
    pub ytime: u32,
    pub thresh: f64,
}

/// Per-cell thresholds for days 1..=365.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    by_cell: BTreeMap<u32, (GridCell, Vec<f64>)>,
    leap_day: LeapDayPolicy,
}

impl ThresholdTable {
    /// Threshold for a cell on a day of year.
    ///
    /// Day 366 maps to day 365 under `FoldInto365` and has no threshold under `Drop`.
    pub fn threshold(&self, g_id: u32, ytime: u32) -> Option<f64> {
        let day = match (ytime, self.leap_day) {
            (LEAP_DAY_OF_YEAR, LeapDayPolicy::FoldInto365) => DAYS_PER_YEAR,
            (LEAP_DAY_OF_YEAR, LeapDayPolicy::Drop) => return None,
            (d, _) => d,
        };
        if day == 0 || day > DAYS_PER_YEAR {
            return None;
        }
        self.by_cell
            .get(&g_id)
            .map(|(_, days)| days[(day - 1) as usize])
    }

    pub fn leap_day(&self) -> LeapDayPolicy {
        self.leap_day
    }

    pub fn n_cells(&self) -> usize {
        self.by_cell.len()
    }

    /// Rows ordered by g_id then day of year.
    pub fn rows(&self) -> impl Iterator<Item = ThresholdRow> + '_ {
        self.by_cell.iter().flat_map(|(&g_id, (cell, days))| {
            days.iter().enumerate().map(move |(i, &thresh)| ThresholdRow {
                g_id,
                x: cell.x,
                y: cell.y,
                ytime: i as u32 + 1,
                thresh,
            })
        })
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdEstimator {
    percentile: f64,
    window_days: u32,
    min_samples: usize,
    leap_day: LeapDayPolicy,
}

impl ThresholdEstimator {
    pub fn new(config: &PipelineConfig) -> Self {
        ThresholdEstimator {
            percentile: config.percentile,
            window_days: config.window_days,
            min_samples: config.min_samples,
            leap_day: config.leap_day,
        }
    }

    /// Estimate thresholds for every cell present in `records`.
    ///
    /// Cells are processed in parallel; a cell/day pool smaller than
    /// `min_samples` is an error naming that cell and day.
    pub fn estimate(&self, records: &[DailyRecord]) -> Result<ThresholdTable> {
        if records.is_empty() {
            return Err(HeatwaveError::EmptyInput(
                "no records to estimate thresholds from".to_string(),
            ));
        }

        // g_id -> (cell, samples by day-of-year slot 0..365)
        let mut samples: BTreeMap<u32, (GridCell, Vec<Vec<f64>>)> = BTreeMap::new();
        for record in records {
            let slot = match (record.ytime(), self.leap_day) {
                (LEAP_DAY_OF_YEAR, LeapDayPolicy::Drop) => continue,
                (LEAP_DAY_OF_YEAR, LeapDayPolicy::FoldInto365) => DAYS_PER_YEAR - 1,
                (d, _) => d - 1,
            };
            samples
                .entry(record.g_id)
                .or_insert_with(|| (record.cell, vec![Vec::new(); DAYS_PER_YEAR as usize]))
                .1[slot as usize]
                .push(record.temperature);
        }

        let windows: Vec<Vec<u32>> = (1..=DAYS_PER_YEAR)
            .map(|day| circular_window(day, self.window_days))
            .collect();

        // collected before checking so the reported failure is the lowest g_id, not the fastest thread
        let estimated: Vec<Result<(u32, (GridCell, Vec<f64>))>> = samples
            .into_par_iter()
            .map(|(g_id, (cell, by_day))| {
                self.estimate_cell(g_id, cell, &by_day, &windows)
                    .map(|days| (g_id, (cell, days)))
            })
            .collect();

        let table = ThresholdTable {
            by_cell: estimated.into_iter().collect::<Result<BTreeMap<_, _>>>()?,
            leap_day: self.leap_day,
        };
        log::info!(
            "threshold: estimated p{} thresholds for {} cells over a {}-day window",
            self.percentile,
            table.n_cells(),
            self.window_days
        );
        Ok(table)
    }

    fn estimate_cell(
        &self,
        g_id: u32,
        cell: GridCell,
        by_day: &[Vec<f64>],
        windows: &[Vec<u32>],
    ) -> Result<Vec<f64>> {
        let mut thresholds = Vec::with_capacity(windows.len());
        let mut pool = Vec::new();
        for (i, window) in windows.iter().enumerate() {
            pool.clear();
            for &day in window {
                pool.extend_from_slice(&by_day[(day - 1) as usize]);
            }
            let day = i as u32 + 1;
            if pool.len() < self.min_samples {
                return Err(HeatwaveError::InsufficientSamples {
                    g_id,
                    x: cell.x,
                    y: cell.y,
                    day,
                    needed: self.min_samples,
                    found: pool.len(),
                });
            }
            pool.sort_by(|a, b| a.total_cmp(b));
            let thresh = percentile_sorted(&pool, self.percentile).ok_or_else(|| {
                HeatwaveError::InvalidConfig(format!("percentile {}", self.percentile))
            })?;
            thresholds.push(thresh);
        }
        Ok(thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hwf_core::grid::GridSpec;
    use hwf_core::time_axis::DateRange;

    fn seasonal_records(grid: &GridSpec, years: std::ops::RangeInclusive<i32>) -> Vec<DailyRecord> {
        let start = NaiveDate::from_ymd_opt(*years.start(), 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(*years.end(), 12, 31).unwrap();
        let mut records = Vec::new();
        for (i, date) in DateRange(start, end).enumerate() {
            for (x, lon) in [(0u32, 0.0), (1, 1.0)] {
                let base = 20.0 + 10.0 * x as f64;
                let t = base + ((i * 7919) % 101) as f64 / 10.0;
                records.push(DailyRecord::locate(grid, lon, 0.0, date, t).unwrap());
            }
        }
        records
    }

    #[test]
    fn test_threshold_within_pool_range() {
        let grid = GridSpec::new(0.0, 0.0, 1.0, 1.0, 2, 1).unwrap();
        let records = seasonal_records(&grid, 2001..=2003);
        let table = ThresholdEstimator::new(&PipelineConfig::default())
            .estimate(&records)
            .unwrap();
        assert_eq!(table.n_cells(), 2);
        for day in 1..=365 {
            let t0 = table.threshold(0, day).unwrap();
            let t1 = table.threshold(1, day).unwrap();
            assert!((20.0..=30.0).contains(&t0));
            assert!((30.0..=40.0).contains(&t1));
        }
        assert_eq!(table.rows().count(), 2 * 365);
    }

    #[test]
    fn test_raising_percentile_never_lowers_threshold() {
        let grid = GridSpec::new(0.0, 0.0, 1.0, 1.0, 2, 1).unwrap();
        let records = seasonal_records(&grid, 2001..=2002);
        let mut previous: Option<ThresholdTable> = None;
        for percentile in [50.0, 90.0, 95.0, 99.0, 100.0] {
            let config = PipelineConfig {
                percentile,
                ..PipelineConfig::default()
            };
            let table = ThresholdEstimator::new(&config).estimate(&records).unwrap();
            if let Some(lower) = &previous {
                for (a, b) in lower.rows().zip(table.rows()) {
                    assert!(b.thresh >= a.thresh);
                }
            }
            previous = Some(table);
        }
    }

    #[test]
    fn test_insufficient_samples_names_cell_and_day() {
        let grid = GridSpec::new(0.0, 0.0, 1.0, 1.0, 2, 1).unwrap();
        let records = seasonal_records(&grid, 2001..=2001);
        let config = PipelineConfig {
            min_samples: 32,
            ..PipelineConfig::default()
        };
        let result = ThresholdEstimator::new(&config).estimate(&records);
        match result {
            Err(HeatwaveError::InsufficientSamples {
                g_id, day, found, needed, ..
            }) => {
                assert_eq!(g_id, 0);
                assert_eq!(day, 1);
                assert_eq!(found, 31);
                assert_eq!(needed, 32);
            }
            other => panic!("expected InsufficientSamples, got {other:?}"),
        }
    }

    #[test]
    fn test_leap_day_policies() {
        let grid = GridSpec::new(0.0, 0.0, 1.0, 1.0, 2, 1).unwrap();
        let records = seasonal_records(&grid, 2019..=2020);
        let folded = ThresholdEstimator::new(&PipelineConfig::default())
            .estimate(&records)
            .unwrap();
        assert_eq!(folded.threshold(0, 366), folded.threshold(0, 365));

        let config = PipelineConfig {
            leap_day: LeapDayPolicy::Drop,
            ..PipelineConfig::default()
        };
        let dropped = ThresholdEstimator::new(&config).estimate(&records).unwrap();
        assert_eq!(dropped.threshold(0, 366), None);
        assert!(dropped.threshold(0, 365).is_some());
        assert_eq!(dropped.threshold(0, 0), None);
        assert_eq!(dropped.threshold(7, 100), None);
    }
}
