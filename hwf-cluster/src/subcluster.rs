//! Spatial sub-clustering of a seasonal family.
//!
//! Two heatwaves are close when one's footprint largely covers the other's:
//! `intersection_strength = |A ∩ B| / min(|A|, |B|)` and
//! `distance = 1 - intersection_strength`. Shared cells are counted through an
//! inverted index from grid cell to heatwave, so only overlapping pairs are
//! ever visited; every other pair is at distance 1.

use crate::upgma::{condensed_index, Dendrogram};
use hwf_core::error::{HeatwaveError, Result};
use hwf_data::pipeline::Detection;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub fn intersection_strength(a: &BTreeSet<u32>, b: &BTreeSet<u32>) -> f64 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / smaller as f64
}

/// Condensed `1 - intersection_strength` matrix over the footprints.
pub fn condensed_distances(footprints: &[&BTreeSet<u32>]) -> Vec<f64> {
    let n = footprints.len();
    let mut by_cell: HashMap<u32, Vec<usize>> = HashMap::new();
    for (i, footprint) in footprints.iter().enumerate() {
        for &g_id in footprint.iter() {
            by_cell.entry(g_id).or_default().push(i);
        }
    }

    let mut shared: HashMap<(usize, usize), usize> = HashMap::new();
    for holders in by_cell.values() {
        for (k, &i) in holders.iter().enumerate() {
            for &j in &holders[k + 1..] {
                *shared.entry((i, j)).or_default() += 1;
            }
        }
    }

    let mut condensed = vec![1.0; n * n.saturating_sub(1) / 2];
    for (&(i, j), &count) in &shared {
        let smaller = footprints[i].len().min(footprints[j].len());
        condensed[condensed_index(n, i, j)] = 1.0 - count as f64 / smaller as f64;
    }
    condensed
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubfamilySummary {
    pub family: u32,
    pub subfamily: u32,
    pub n_heatwaves: usize,
    /// Distinct grid cells covered by the subfamily's heatwaves
    pub n_unique_g_ids: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubclusterEngine {
    /// `u`, the number of subfamilies per family.
    pub n_subclusters: usize,
    /// Only sub-cluster this family; all families when `None`.
    pub family: Option<u32>,
}

impl SubclusterEngine {
    pub fn new(n_subclusters: usize, family: Option<u32>) -> Self {
        SubclusterEngine {
            n_subclusters,
            family,
        }
    }

    /// Subfamily label of each footprint in one family.
    pub fn subcluster(&self, family: u32, footprints: &[&BTreeSet<u32>]) -> Result<Vec<u32>> {
        if self.n_subclusters > footprints.len() {
            return Err(HeatwaveError::TooManyClusters {
                stage: format!("UPGMA sub-clustering of family {family}"),
                requested: self.n_subclusters,
                available: footprints.len(),
            });
        }
        let condensed = condensed_distances(footprints);
        Dendrogram::average(footprints.len(), &condensed)?.cut(self.n_subclusters)
    }

    /// Attach subfamily labels to the retained heatwaves of the selected families.
    ///
    /// Families must already be assigned.
    pub fn apply(&self, detection: &mut Detection) -> Result<Vec<SubfamilySummary>> {
        // family id -> positions in `components`
        let mut families: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (i, component) in detection.components.iter().enumerate() {
            if !component.retained {
                continue;
            }
            let family = component.family.as_ref().ok_or_else(|| {
                HeatwaveError::InvalidConfig(format!(
                    "heatwave {} has no family; assign families before sub-clustering",
                    component.cp
                ))
            })?;
            families.entry(family.id).or_default().push(i);
        }
        if let Some(selected) = self.family {
            let members = families.remove(&selected).unwrap_or_default();
            families = BTreeMap::from([(selected, members)]);
        }

        let mut summaries = Vec::new();
        for (family, members) in families {
            let footprints: Vec<&BTreeSet<u32>> = members
                .iter()
                .map(|&i| &detection.components[i].g_ids)
                .collect();
            let labels = self.subcluster(family, &footprints)?;

            let mut cells: BTreeMap<u32, (usize, BTreeSet<u32>)> = BTreeMap::new();
            for (&i, &label) in members.iter().zip(&labels) {
                let component = &mut detection.components[i];
                component.subfamily = Some(label);
                let entry = cells.entry(label).or_default();
                entry.0 += 1;
                entry.1.extend(component.g_ids.iter().copied());
            }
            for (subfamily, (n_heatwaves, g_ids)) in cells {
                log::info!(
                    "subcluster: family {} subfamily {} has {} heatwaves over {} cells",
                    family,
                    subfamily,
                    n_heatwaves,
                    g_ids.len()
                );
                summaries.push(SubfamilySummary {
                    family,
                    subfamily,
                    n_heatwaves,
                    n_unique_g_ids: g_ids.len(),
                });
            }
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(cells: &[u32]) -> BTreeSet<u32> {
        cells.iter().copied().collect()
    }

    #[test]
    fn test_intersection_strength_uses_smaller_footprint() {
        let a = set(&[1, 2, 3]);
        let b = set(&[2, 3]);
        assert_eq!(intersection_strength(&a, &b), 1.0);
        assert_eq!(intersection_strength(&b, &a), 1.0);
        assert_eq!(intersection_strength(&a, &set(&[3, 4, 5, 6])), 1.0 / 3.0);
        assert_eq!(intersection_strength(&a, &set(&[7])), 0.0);
    }

    #[test]
    fn test_condensed_matches_pairwise() {
        let footprints = [set(&[1, 2, 3]), set(&[2, 3]), set(&[3, 4, 5, 6]), set(&[9])];
        let refs: Vec<&BTreeSet<u32>> = footprints.iter().collect();
        let condensed = condensed_distances(&refs);
        for i in 0..4 {
            for j in i + 1..4 {
                let expected = 1.0 - intersection_strength(&footprints[i], &footprints[j]);
                assert!((condensed[condensed_index(4, i, j)] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_nested_footprints_merge_first() {
        // A = {1,2,3} and B = {2,3} are at distance 0 and must merge first,
        // whatever else is in the family
        let footprints = [
            set(&[10, 11, 12, 13]),
            set(&[1, 2, 3]),
            set(&[12, 13, 14, 15]),
            set(&[2, 3]),
            set(&[3, 20, 21]),
        ];
        let refs: Vec<&BTreeSet<u32>> = footprints.iter().collect();
        let tree = Dendrogram::average(refs.len(), &condensed_distances(&refs)).unwrap();
        let first = tree.merges()[0];
        assert_eq!((first.left, first.right, first.distance), (1, 3, 0.0));

        let labels = SubclusterEngine::new(2, None).subcluster(0, &refs).unwrap();
        assert_eq!(labels[1], labels[3]);
        assert_eq!(labels[0], labels[2]);
    }

    #[test]
    fn test_u_larger_than_family_fails() {
        let footprints = [set(&[1]), set(&[2])];
        let refs: Vec<&BTreeSet<u32>> = footprints.iter().collect();
        match SubclusterEngine::new(3, None).subcluster(7, &refs) {
            Err(HeatwaveError::TooManyClusters {
                stage,
                requested,
                available,
            }) => {
                assert!(stage.contains("family 7"));
                assert_eq!((requested, available), (3, 2));
            }
            other => panic!("expected TooManyClusters, got {other:?}"),
        }
    }
}
