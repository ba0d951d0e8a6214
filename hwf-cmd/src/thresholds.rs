use crate::input::{load_config, load_records, DateWindow, Overrides};
use crate::output::write_csv;
use anyhow::Context;
use hwf_data::threshold::{ThresholdEstimator, ThresholdRow};
use log::info;
use std::path::Path;

/// Estimate thresholds for every cell and day of year and write them to `output`.
pub fn run_thresholds(
    input: &str,
    output: &str,
    config_path: Option<&str>,
    window: DateWindow,
) -> anyhow::Result<()> {
    let config = load_config(config_path, &Overrides::default())?;
    let (_, records) = load_records(input, &config, window)?;
    info!("Estimating thresholds from {} records", records.len());

    let table = ThresholdEstimator::new(&config)
        .estimate(&records)
        .context("Threshold estimation failed")?;
    let rows: Vec<ThresholdRow> = table.rows().collect();
    write_csv(Path::new(output), &rows)
}
