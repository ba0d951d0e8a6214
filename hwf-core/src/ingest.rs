//! Reading the daily gridded temperature table.
//!
//! # CSV Format
//!
//! Headers are required; extra columns are ignored:
//!
//! ```text
//! longitude,latitude,time,t2m
//! -15.0,35.0,1979-01-01,12.4
//! -14.75,35.0,1979-01-01 00:00:00,12.9
//! -14.5,35.0,1979-01-01,
//! ```
//!
//! An empty `t2m` is a missing observation and the row is skipped.

use crate::config::TemperatureUnit;
use crate::error::{HeatwaveError, Result};
use crate::grid::GridSpec;
use crate::record::DailyRecord;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use hwf_utils::dates::parse_day_prefix;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::io::Read;

/// One row of the input table as it appears on disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DailyRow {
    pub longitude: f64,
    pub latitude: f64,
    #[serde(deserialize_with = "deserialize_day")]
    pub time: NaiveDate,
    pub t2m: Option<f64>,
}

fn deserialize_day<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_day_prefix(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unparseable date {raw:?}")))
}

/// Parse the daily table, dropping rows without a finite temperature.
pub fn read_daily_rows<R: Read>(reader: R) -> Result<Vec<DailyRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize::<DailyRow>() {
        let row = result?;
        match row.t2m {
            Some(t) if t.is_finite() => rows.push(row),
            _ => skipped += 1,
        }
    }
    log::info!(
        "ingest: read {} daily rows, skipped {} missing observations",
        rows.len(),
        skipped
    );
    Ok(rows)
}

/// Place rows on the grid and convert temperatures to Celsius.
///
/// Fails on the first coordinate off the lattice or outside the grid, and on
/// a second row for the same cell and date.
pub fn to_daily_records(
    rows: &[DailyRow],
    grid: &GridSpec,
    unit: TemperatureUnit,
) -> Result<Vec<DailyRecord>> {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(t2m) = row.t2m.filter(|t| t.is_finite()) else {
            continue;
        };
        let record = DailyRecord::locate(
            grid,
            row.longitude,
            row.latitude,
            row.time,
            unit.to_celsius(t2m),
        )?;
        if !seen.insert((record.g_id, record.date)) {
            return Err(HeatwaveError::DuplicateRecord {
                g_id: record.g_id,
                date: record.date,
            });
        }
        records.push(record);
    }
    Ok(records)
}

/// Infer the lattice from the rows' coordinates.
pub fn infer_grid(rows: &[DailyRow]) -> Result<GridSpec> {
    GridSpec::infer(rows.iter().map(|r| (r.longitude, r.latitude)))
}
