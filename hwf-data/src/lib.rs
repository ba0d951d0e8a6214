//! Heatwave detection stages over a daily gridded temperature record.
//!
//! Stages run in sequence, each consuming the previous stage's output:
//! thresholds, magnitude references, extreme-event extraction, adjacency
//! graph construction, component labeling and aggregation. [`pipeline::detect`]
//! chains them.

pub mod aggregate;
pub mod extract;
pub mod graph;
pub mod labeler;
pub mod magnitude;
pub mod pipeline;
pub mod tables;
pub mod threshold;
