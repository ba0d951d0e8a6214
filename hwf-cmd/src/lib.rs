//! Command implementations for HWF CLI.
//!
//! Provides subcommands for detecting and classifying heatwaves in a daily
//! gridded temperature table, and for inspecting the extreme thresholds.

use chrono::NaiveDate;
use clap::Subcommand;
use hwf_utils::dates::parse_date;
use input::{DateWindow, Overrides};

pub mod input;
pub mod output;
pub mod run;
pub mod thresholds;

#[derive(Subcommand)]
pub enum Command {
    /// Detect heatwaves, assign seasonal families and optional subfamilies
    Run {
        /// Daily temperature CSV (longitude,latitude,time,t2m)
        #[arg(short = 'i', long)]
        input: String,

        /// Directory the events, heatwaves, footprints and summary files are written to
        #[arg(short = 'o', long)]
        output_dir: String,

        /// TOML file with pipeline parameters
        #[arg(short = 'c', long)]
        config: Option<String>,

        /// Percentile of the pooled window used as the extreme threshold
        #[arg(long)]
        percentile: Option<f64>,

        /// A heatwave must cover more than this many grid cells
        #[arg(short = 'b', long)]
        min_grid_cells: Option<usize>,

        /// Number of seasonal k-means clusters
        #[arg(short = 'k', long)]
        cluster_number: Option<usize>,

        /// Number of UPGMA subfamilies per family
        #[arg(short = 'u', long)]
        upgma_clusters: Option<usize>,

        /// Only sub-cluster this family
        #[arg(long)]
        family: Option<u32>,

        /// Use fixed meteorological seasons instead of k-means families
        #[arg(long)]
        fixed_seasons: bool,

        /// First date to analyse (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,

        /// Last date to analyse (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,
    },

    /// Estimate the per-cell, per-day extreme thresholds and write them as CSV
    Thresholds {
        /// Daily temperature CSV (longitude,latitude,time,t2m)
        #[arg(short = 'i', long)]
        input: String,

        /// Output path for the thresholds CSV
        #[arg(short = 'o', long)]
        output: String,

        /// TOML file with pipeline parameters
        #[arg(short = 'c', long)]
        config: Option<String>,

        /// First date to analyse (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,

        /// Last date to analyse (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Run {
            input,
            output_dir,
            config,
            percentile,
            min_grid_cells,
            cluster_number,
            upgma_clusters,
            family,
            fixed_seasons,
            from,
            to,
        } => {
            let overrides = Overrides {
                percentile,
                min_grid_cells,
                n_seasonal_clusters: cluster_number,
                n_upgma_subclusters: upgma_clusters,
                subcluster_family: family,
                fixed_seasons,
            };
            run::run_pipeline(
                &input,
                &output_dir,
                config.as_deref(),
                &overrides,
                DateWindow { from, to },
            )
        }
        Command::Thresholds {
            input,
            output,
            config,
            from,
            to,
        } => thresholds::run_thresholds(
            &input,
            &output,
            config.as_deref(),
            DateWindow { from, to },
        ),
    }
}
