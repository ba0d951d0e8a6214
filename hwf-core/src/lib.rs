pub mod config;
pub mod error;
pub mod grid;
pub mod ingest;
pub mod labels;
pub mod record;
pub mod time_axis;
