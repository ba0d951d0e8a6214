//! Spatio-temporal adjacency between extreme events.
//!
//! Two events are adjacent iff they are exactly one day apart and their cells
//! are Moore neighbours (or the same cell). Events are bucketed by `itime`,
//! only consecutive buckets `(i, i + 1)` are compared, and within a bucket pair
//! the `(x, y)`-sorted target bucket is searched by binary partition around
//! each source cell, so the cost is linear in the number of events times a
//! logarithm, never quadratic.
//!
//! Memory is bounded by `edge_batch_cap`: every source event has at most 9
//! candidate neighbours, so work is split into units of at most
//! `edge_batch_cap / 9` source events and grouped into passes whose worst-case
//! edge count stays under the cap. Each pass is linked in parallel and handed
//! to the caller as one batch before the next pass starts. A pass always
//! holds at least one source event, so a cap below 9 can still see up to 9
//! edges per pass; `PipelineConfig::validate` rejects such caps.

use hwf_core::error::{HeatwaveError, Result};
use hwf_core::grid::GridSpec;
use hwf_core::record::EventRecord;
use rayon::prelude::*;
use std::ops::Range;

/// Upper bound on the neighbours a single event can have in the next day.
const MOORE_NEIGHBORHOOD: usize = 9;

/// Pair of adjacent event ids, `source` on day `i`, `target` on day `i + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AdjacencyEdge {
    pub source: usize,
    pub target: usize,
}

/// Counts from one traversal of the event set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub events: usize,
    pub buckets: usize,
    /// Bucket pairs one day apart
    pub bucket_pairs: usize,
    pub passes: usize,
    pub edges: usize,
}

/// The exact adjacency predicate.
pub fn is_adjacent(s: &EventRecord, t: &EventRecord) -> bool {
    s.itime.abs_diff(t.itime) == 1 && s.cell.is_moore_neighbor(&t.cell)
}

/// A slice of a source bucket linked against the whole next bucket.
#[derive(Debug, Clone)]
struct WorkUnit {
    source: Range<usize>,
    target: Range<usize>,
}

impl WorkUnit {
    fn budget(&self) -> usize {
        self.source.len() * MOORE_NEIGHBORHOOD
    }
}

pub struct SpatioTemporalGraphBuilder<'a> {
    grid: &'a GridSpec,
    edge_batch_cap: usize,
}

impl<'a> SpatioTemporalGraphBuilder<'a> {
    pub fn new(grid: &'a GridSpec, edge_batch_cap: usize) -> Self {
        SpatioTemporalGraphBuilder {
            grid,
            edge_batch_cap: edge_batch_cap.max(1),
        }
    }

    /// Stream every adjacency edge to `sink`, one bounded batch per pass.
    ///
    /// `events` must be densely numbered (`id == position`) in strictly
    /// increasing `(itime, x, y)` order, which is how the extractor emits them.
    pub fn for_each_batch<F>(&self, events: &[EventRecord], mut sink: F) -> Result<GraphStats>
    where
        F: FnMut(&[AdjacencyEdge]) -> Result<()>,
    {
        self.validate(events)?;
        let buckets = time_buckets(events);
        let units = self.work_units(events, &buckets);

        let mut stats = GraphStats {
            events: events.len(),
            buckets: buckets.len(),
            bucket_pairs: buckets
                .windows(2)
                .filter(|w| events[w[1].start].itime == events[w[0].start].itime + 1)
                .count(),
            ..GraphStats::default()
        };

        for pass in self.passes(&units) {
            let linked: Vec<Vec<AdjacencyEdge>> = pass
                .par_iter()
                .map(|unit| link(events, unit))
                .collect();
            let batch: Vec<AdjacencyEdge> = linked.into_iter().flatten().collect();
            stats.passes += 1;
            stats.edges += batch.len();
            log::debug!(
                "graph: pass {} linked {} work units into {} edges",
                stats.passes,
                pass.len(),
                batch.len()
            );
            sink(&batch)?;
        }

        log::info!(
            "graph: {} events in {} day buckets, {} edges over {} passes",
            stats.events,
            stats.buckets,
            stats.edges,
            stats.passes
        );
        Ok(stats)
    }

    /// Collect every edge at once; for small inputs and tests.
    pub fn edges(&self, events: &[EventRecord]) -> Result<Vec<AdjacencyEdge>> {
        let mut edges = Vec::new();
        self.for_each_batch(events, |batch| {
            edges.extend_from_slice(batch);
            Ok(())
        })?;
        Ok(edges)
    }

    fn validate(&self, events: &[EventRecord]) -> Result<()> {
        for (index, event) in events.iter().enumerate() {
            if event.id != index {
                return Err(HeatwaveError::UnorderedEvents { index });
            }
            if index > 0 && events[index - 1].order_key() >= event.order_key() {
                return Err(HeatwaveError::UnorderedEvents { index });
            }
            self.grid.check(&event.cell)?;
        }
        Ok(())
    }

    fn work_units(&self, events: &[EventRecord], buckets: &[Range<usize>]) -> Vec<WorkUnit> {
        let chunk = (self.edge_batch_cap / MOORE_NEIGHBORHOOD).max(1);
        let mut units = Vec::new();
        for pair in buckets.windows(2) {
            let (source, target) = (&pair[0], &pair[1]);
            if events[target.start].itime != events[source.start].itime + 1 {
                continue;
            }
            let mut start = source.start;
            while start < source.end {
                let end = (start + chunk).min(source.end);
                units.push(WorkUnit {
                    source: start..end,
                    target: target.clone(),
                });
                start = end;
            }
        }
        units
    }

    /// Group consecutive units so each pass's worst case fits the cap.
    fn passes<'u>(&self, units: &'u [WorkUnit]) -> Vec<&'u [WorkUnit]> {
        let mut passes = Vec::new();
        let mut start = 0;
        let mut budget = 0;
        for (i, unit) in units.iter().enumerate() {
            if i > start && budget + unit.budget() > self.edge_batch_cap {
                passes.push(&units[start..i]);
                start = i;
                budget = 0;
            }
            budget += unit.budget();
        }
        if start < units.len() {
            passes.push(&units[start..]);
        }
        passes
    }
}

/// Contiguous ranges of events sharing an `itime`.
fn time_buckets(events: &[EventRecord]) -> Vec<Range<usize>> {
    let mut buckets = Vec::new();
    let mut start = 0;
    for i in 1..=events.len() {
        if i == events.len() || events[i].itime != events[start].itime {
            buckets.push(start..i);
            start = i;
        }
    }
    buckets
}

fn link(events: &[EventRecord], unit: &WorkUnit) -> Vec<AdjacencyEdge> {
    let target = &events[unit.target.clone()];
    let mut edges = Vec::new();
    for s in &events[unit.source.clone()] {
        let (x, y) = (s.cell.x, s.cell.y);
        for tx in x.saturating_sub(1)..=x.saturating_add(1) {
            let y_lo = y.saturating_sub(1);
            let first = target.partition_point(|t| (t.cell.x, t.cell.y) < (tx, y_lo));
            for t in target[first..]
                .iter()
                .take_while(|t| t.cell.x == tx && t.cell.y <= y.saturating_add(1))
            {
                if is_adjacent(s, t) {
                    edges.push(AdjacencyEdge {
                        source: s.id,
                        target: t.id,
                    });
                }
            }
        }
    }
    edges
}
