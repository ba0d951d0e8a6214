//! Full detection and classification run.

use crate::input::{load_config, load_records, DateWindow, Overrides};
use crate::output::{write_csv, write_summary, RunSummary};
use anyhow::Context;
use hwf_cluster::footprint::footprints;
use hwf_cluster::seasonal::SeasonalClusterer;
use hwf_cluster::subcluster::SubclusterEngine;
use hwf_data::pipeline::detect;
use hwf_data::tables::{event_rows, heatwave_rows};
use log::{info, warn};
use std::path::Path;

pub const EVENTS_CSV: &str = "events.csv";
pub const HEATWAVES_CSV: &str = "heatwaves.csv";
pub const FAMILY_FOOTPRINTS_CSV: &str = "family_footprints.csv";
pub const SUBFAMILY_FOOTPRINTS_CSV: &str = "subfamily_footprints.csv";
pub const SUMMARY_JSON: &str = "summary.json";

/// Run every stage on `input` and write the tables into `output_dir`.
///
/// Writes `events.csv` (one row per event of a retained heatwave),
/// `heatwaves.csv` (one row per retained heatwave), `family_footprints.csv`,
/// `subfamily_footprints.csv` when sub-clustering ran, and `summary.json`.
pub fn run_pipeline(
    input: &str,
    output_dir: &str,
    config_path: Option<&str>,
    overrides: &Overrides,
    window: DateWindow,
) -> anyhow::Result<()> {
    let config = load_config(config_path, overrides)?;
    let (grid, records) = load_records(input, &config, window)?;

    let mut detection = detect(&records, &grid, &config).context("Heatwave detection failed")?;
    info!(
        "Detected {} heatwaves among {} components",
        detection.n_heatwaves(),
        detection.labels.n_components()
    );

    let families = SeasonalClusterer::from_config(&config)
        .apply(&mut detection)
        .context("Seasonal clustering failed")?;

    let subfamilies = match config.n_upgma_subclusters {
        Some(_) if families.is_empty() => {
            warn!("No families to sub-cluster");
            Vec::new()
        }
        Some(u) => SubclusterEngine::new(u, config.subcluster_family)
            .apply(&mut detection)
            .context("Sub-clustering failed")?,
        None => Vec::new(),
    };

    let out = Path::new(output_dir);
    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory {}", output_dir))?;
    write_csv(&out.join(EVENTS_CSV), &event_rows(&detection))?;
    write_csv(&out.join(HEATWAVES_CSV), &heatwave_rows(&detection))?;
    write_csv(&out.join(FAMILY_FOOTPRINTS_CSV), &footprints(&detection, false))?;
    if !subfamilies.is_empty() {
        write_csv(&out.join(SUBFAMILY_FOOTPRINTS_CSV), &footprints(&detection, true))?;
    }

    let summary = RunSummary::new(input, &detection, families, subfamilies, &config);
    write_summary(&out.join(SUMMARY_JSON), &summary)?;
    info!("Run complete. Output: {}", output_dir);
    Ok(())
}
