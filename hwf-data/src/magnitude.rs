//! HWMId-style heat magnitude.
//!
//! Per grid cell, the 25th and 75th percentiles of the annual maximum
//! temperatures form the reference. An event of temperature `v` scores
//! `(v - p25) / (p75 - p25)` when `v > p25`, and 0 otherwise.
//!
//! When `p75 == p25` (e.g. a single year of data, or identical annual
//! maxima) the reference is degenerate and every event in that cell scores 0.
//! Degenerate cells are counted and reported instead of producing NaN/inf.

use hwf_core::error::{HeatwaveError, Result};
use hwf_core::record::DailyRecord;
use hwf_utils::stats::percentile;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// p25/p75 of a cell's annual maxima.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeReference {
    pub p25: f64,
    pub p75: f64,
}

impl MagnitudeReference {
    pub fn from_annual_maxima(annual_maxima: &mut [f64]) -> Option<Self> {
        Some(MagnitudeReference {
            p25: percentile(annual_maxima, 25.0)?,
            p75: percentile(annual_maxima, 75.0)?,
        })
    }

    pub fn is_degenerate(&self) -> bool {
        self.p75 <= self.p25
    }

    pub fn score(&self, value: f64) -> f64 {
        if value <= self.p25 || self.is_degenerate() {
            return 0.0;
        }
        (value - self.p25) / (self.p75 - self.p25)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MagnitudeScorer {
    by_cell: BTreeMap<u32, MagnitudeReference>,
}

impl MagnitudeScorer {
    /// Build references from the full daily record (not only the extremes).
    pub fn from_records(records: &[DailyRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(HeatwaveError::EmptyInput(
                "no records to derive magnitude references from".to_string(),
            ));
        }
        // g_id -> year -> annual maximum
        let mut maxima: BTreeMap<u32, BTreeMap<i32, f64>> = BTreeMap::new();
        for record in records {
            maxima
                .entry(record.g_id)
                .or_default()
                .entry(record.year())
                .and_modify(|m| *m = m.max(record.temperature))
                .or_insert(record.temperature);
        }

        let by_cell: BTreeMap<u32, MagnitudeReference> = maxima
            .into_par_iter()
            .filter_map(|(g_id, years)| {
                let mut annual: Vec<f64> = years.into_values().collect();
                MagnitudeReference::from_annual_maxima(&mut annual).map(|r| (g_id, r))
            })
            .collect();

        let scorer = MagnitudeScorer { by_cell };
        let degenerate = scorer.degenerate_cells();
        if degenerate > 0 {
            log::warn!(
                "magnitude: {} of {} cells have p75 == p25 of annual maxima; their magnitudes are 0",
                degenerate,
                scorer.by_cell.len()
            );
        }
        log::info!("magnitude: references for {} cells", scorer.by_cell.len());
        Ok(scorer)
    }

    pub fn reference(&self, g_id: u32) -> Option<MagnitudeReference> {
        self.by_cell.get(&g_id).copied()
    }

    /// Magnitude of `value` in cell `g_id`; 0 for a cell without a reference.
    pub fn score(&self, g_id: u32, value: f64) -> f64 {
        self.reference(g_id).map_or(0.0, |r| r.score(value))
    }

    pub fn degenerate_cells(&self) -> usize {
        self.by_cell.values().filter(|r| r.is_degenerate()).count()
    }
}
