//! Writing result tables and the run summary.

use anyhow::Context;
use hwf_cluster::seasonal::FamilySummary;
use hwf_cluster::subcluster::SubfamilySummary;
use hwf_core::config::PipelineConfig;
use hwf_data::pipeline::Detection;
use log::info;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Write serializable rows as a CSV file with a header line.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Counts and parameters of one run, written as JSON next to the tables.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input: String,
    pub first_date: String,
    pub last_date: String,
    pub n_records: usize,
    pub n_extreme_events: usize,
    pub n_components: usize,
    pub n_isolated_events: usize,
    pub n_heatwaves: usize,
    pub graph_passes: usize,
    pub n_edges: usize,
    pub families: Vec<FamilySummary>,
    pub subfamilies: Vec<SubfamilySummary>,
    pub config: PipelineConfig,
}

impl RunSummary {
    pub fn new(
        input: &str,
        detection: &Detection,
        families: Vec<FamilySummary>,
        subfamilies: Vec<SubfamilySummary>,
        config: &PipelineConfig,
    ) -> Self {
        RunSummary {
            input: input.to_string(),
            first_date: hwf_utils::dates::format_date(&detection.axis.start()),
            last_date: hwf_utils::dates::format_date(&detection.axis.end()),
            n_records: detection.n_records,
            n_extreme_events: detection.events.len(),
            n_components: detection.labels.n_components(),
            n_isolated_events: detection.labels.n_isolated(),
            n_heatwaves: detection.n_heatwaves(),
            graph_passes: detection.graph.passes,
            n_edges: detection.graph.edges,
            families,
            subfamilies,
            config: config.clone(),
        }
    }
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)?;
    info!("Wrote run summary to {}", path.display());
    Ok(())
}
