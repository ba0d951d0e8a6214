/// Error types for the heatwave pipeline
use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for heatwave detection and clustering
#[derive(Error, Debug)]
pub enum HeatwaveError {
    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// Failed to read or write a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline parameter is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The input table carries no usable rows
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A longitude/latitude pair does not fall on the grid lattice
    #[error("Coordinate (lon {longitude}, lat {latitude}) is not on the grid lattice")]
    NonIntegerCoordinate { longitude: f64, latitude: f64 },

    /// Grid indices outside the configured grid
    #[error("Grid cell ({x}, {y}) is outside the {nx}x{ny} grid")]
    CellOutOfBounds { x: i64, y: i64, nx: u32, ny: u32 },

    /// More than one row for the same grid cell and date
    #[error("Duplicate record for grid cell {g_id} on {date}")]
    DuplicateRecord { g_id: u32, date: NaiveDate },

    /// A cell/day threshold pool is too small to estimate a percentile
    #[error(
        "Insufficient samples for grid cell {g_id} ({x}, {y}) on day {day} (needed: {needed}, found: {found})"
    )]
    InsufficientSamples {
        g_id: u32,
        x: u32,
        y: u32,
        day: u32,
        needed: usize,
        found: usize,
    },

    /// No threshold is available for a record being evaluated
    #[error("No threshold for grid cell {g_id} on day {day}")]
    MissingThreshold { g_id: u32, day: u32 },

    /// Events handed to the graph builder are not densely numbered in (itime, x, y) order
    #[error("Events must be densely numbered in (itime, x, y) order; violated at position {index}")]
    UnorderedEvents { index: usize },

    /// An adjacency edge refers to an event id the labeler does not know
    #[error("Edge refers to unknown event {id} (only {len} events)")]
    UnknownEvent { id: usize, len: usize },

    /// More clusters requested than there are items to cluster
    #[error("{stage}: requested {requested} clusters but only {available} items are available")]
    TooManyClusters {
        stage: String,
        requested: usize,
        available: usize,
    },
}

/// Type alias for Results using HeatwaveError
pub type Result<T> = std::result::Result<T, HeatwaveError>;
