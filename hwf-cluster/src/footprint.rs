use hwf_core::grid::GridCell;
use hwf_data::pipeline::Detection;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// How often a family (or subfamily) hit one grid cell, for map rendering.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FootprintRow {
    pub family: u32,
    pub family_name: String,
    pub subfamily: Option<u32>,
    pub g_id: u32,
    pub x: u32,
    pub y: u32,
    pub longitude: f64,
    pub latitude: f64,
    /// Distinct heatwaves with at least one event in the cell
    pub n_heatwaves: usize,
    /// Sum of the magnitudes of those events
    pub magnitude_sum: f64,
}

#[derive(Default)]
struct Hits {
    heatwaves: BTreeSet<u32>,
    magnitude_sum: f64,
}

/// Per-cell hits of every family, split by subfamily when `by_subfamily`.
///
/// Heatwaves without a family are skipped, and so are heatwaves without a
/// subfamily when `by_subfamily`. Rows are ordered by family, subfamily,
/// then g_id.
pub fn footprints(detection: &Detection, by_subfamily: bool) -> Vec<FootprintRow> {
    let mut names: BTreeMap<u32, String> = BTreeMap::new();
    let mut hits: BTreeMap<(u32, Option<u32>, u32), Hits> = BTreeMap::new();
    for (event, component) in detection.heatwave_events() {
        let Some(family) = &component.family else {
            continue;
        };
        names
            .entry(family.id)
            .or_insert_with(|| family.name.clone());
        let subfamily = if by_subfamily {
            match component.subfamily {
                Some(subfamily) => Some(subfamily),
                None => continue,
            }
        } else {
            None
        };
        let entry = hits.entry((family.id, subfamily, event.g_id)).or_default();
        entry.heatwaves.insert(component.cp.0);
        entry.magnitude_sum += event.magnitude;
    }

    hits.into_iter()
        .map(|((family, subfamily, g_id), hit)| {
            let cell: GridCell = detection.grid.cell(g_id);
            let (longitude, latitude) = detection.grid.coordinates(&cell);
            FootprintRow {
                family,
                family_name: names.get(&family).cloned().unwrap_or_default(),
                subfamily,
                g_id,
                x: cell.x,
                y: cell.y,
                longitude,
                latitude,
                n_heatwaves: hit.heatwaves.len(),
                magnitude_sum: hit.magnitude_sum,
            }
        })
        .collect()
}
