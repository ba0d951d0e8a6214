//! Two-level classification of detected heatwaves.
//!
//! Heatwaves are first grouped into seasonal families (fixed seasons or
//! seeded k-means on the day-of-year circle), then each family can be split
//! into spatially coherent subfamilies by UPGMA on footprint overlap.

pub mod footprint;
pub mod kmeans;
pub mod seasonal;
pub mod subcluster;
pub mod upgma;
