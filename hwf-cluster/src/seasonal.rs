//! Seasonal family assignment.
//!
//! Heatwaves are grouped by their mean day of year, either onto the four
//! fixed meteorological seasons or by k-means on the circular embedding
//! `(sin(2πd/365), cos(2πd/365))`. Learned clusters are numbered by
//! ascending centroid day of year and named after the fixed season that
//! day falls in, so the labels do not depend on k-means' internal order.

use crate::kmeans::KMeans;
use hwf_core::config::{PipelineConfig, SeasonPolicy};
use hwf_core::error::Result;
use hwf_core::labels::{Family, Season};
use hwf_data::pipeline::Detection;
use hwf_utils::dates::{circular_mean_day_of_year, embed_day_of_year, embedded_day_of_year};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-family counts for the run summary.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FamilySummary {
    pub family: u32,
    pub name: String,
    pub n_heatwaves: usize,
    /// Circular mean of the members' mean day of year
    pub centroid_ytime: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeasonalClusterer {
    Fixed,
    Learned(KMeans),
}

impl SeasonalClusterer {
    pub fn from_config(config: &PipelineConfig) -> Self {
        match config.season_policy {
            SeasonPolicy::Fixed => SeasonalClusterer::Fixed,
            SeasonPolicy::Learned => SeasonalClusterer::Learned(KMeans {
                k: config.n_seasonal_clusters,
                seed: config.kmeans_seed,
                restarts: config.kmeans_restarts,
                max_iter: config.kmeans_max_iter,
            }),
        }
    }

    /// Family of each heatwave, given their mean days of year.
    pub fn assign(&self, mean_days: &[f64]) -> Result<Vec<Family>> {
        match self {
            SeasonalClusterer::Fixed => Ok(mean_days
                .iter()
                .map(|&d| Family::from_season(Season::from_day_of_year(d)))
                .collect()),
            SeasonalClusterer::Learned(kmeans) => {
                let points: Vec<[f64; 2]> =
                    mean_days.iter().map(|&d| embed_day_of_year(d)).collect();
                let fit = kmeans.fit(&points)?;

                let mut order: Vec<(usize, f64)> = fit
                    .centroids
                    .iter()
                    .map(embedded_day_of_year)
                    .enumerate()
                    .collect();
                order.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
                let mut families = vec![None; fit.centroids.len()];
                for (id, (cluster, day)) in order.into_iter().enumerate() {
                    families[cluster] = Some(Family {
                        id: id as u32,
                        name: Season::from_day_of_year(day).name().to_string(),
                    });
                }
                Ok(fit
                    .assignments
                    .iter()
                    .filter_map(|&a| families[a].clone())
                    .collect())
            }
        }
    }

    /// Label every retained heatwave with its family and clear any subfamily.
    ///
    /// A run without retained heatwaves has nothing to cluster and yields no
    /// families.
    pub fn apply(&self, detection: &mut Detection) -> Result<Vec<FamilySummary>> {
        let mean_days: Vec<f64> = detection.heatwaves().map(|c| c.ytime_mean).collect();
        if mean_days.is_empty() {
            log::warn!("seasonal: no retained heatwaves to cluster");
            return Ok(Vec::new());
        }
        let families = self.assign(&mean_days)?;

        let mut members: BTreeMap<u32, (String, Vec<f64>)> = BTreeMap::new();
        for (component, family) in detection.heatwaves_mut().zip(families) {
            members
                .entry(family.id)
                .or_insert_with(|| (family.name.clone(), Vec::new()))
                .1
                .push(component.ytime_mean);
            component.family = Some(family);
            component.subfamily = None;
        }

        let summaries: Vec<FamilySummary> = members
            .into_iter()
            .map(|(family, (name, days))| FamilySummary {
                family,
                name,
                n_heatwaves: days.len(),
                centroid_ytime: circular_mean_day_of_year(days),
            })
            .collect();
        for summary in &summaries {
            log::info!(
                "seasonal: family {} ({}) has {} heatwaves around day {:.1}",
                summary.family,
                summary.name,
                summary.n_heatwaves,
                summary.centroid_ytime
            );
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwf_core::error::HeatwaveError;

    fn learned(k: usize) -> SeasonalClusterer {
        SeasonalClusterer::Learned(KMeans {
            k,
            seed: 100,
            restarts: 10,
            max_iter: 300,
        })
    }

    #[test]
    fn test_fixed_policy() {
        let families = SeasonalClusterer::Fixed
            .assign(&[10.0, 100.0, 200.0, 300.0, 350.0])
            .unwrap();
        let names: Vec<&str> = families.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Winter", "Spring", "Summer", "Autumn", "Winter"]);
        assert_eq!(families[0], families[4]);
    }

    #[test]
    fn test_uniform_year_splits_into_contiguous_quarters() {
        let days: Vec<f64> = (1..=365).map(|d| d as f64).collect();
        let families = learned(4).assign(&days).unwrap();

        let mut sizes = [0usize; 4];
        for family in &families {
            sizes[family.id as usize] += 1;
        }
        for size in sizes {
            assert!((80..=102).contains(&size), "sizes {sizes:?}");
        }

        // circularly contiguous: the label changes exactly 4 times around the year
        let changes = (0..families.len())
            .filter(|&i| families[i].id != families[(i + 1) % families.len()].id)
            .count();
        assert_eq!(changes, 4);
    }

    #[test]
    fn test_learned_families_ordered_by_day() {
        let mut days = Vec::new();
        for centre in [40.0, 130.0, 220.0, 310.0] {
            for offset in -5..=5 {
                days.push(centre + offset as f64);
            }
        }
        let families = learned(4).assign(&days).unwrap();
        let ids: Vec<u32> = families.chunks(11).map(|c| c[0].id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        let names: Vec<&str> = families.chunks(11).map(|c| c[0].name.as_str()).collect();
        assert_eq!(names, vec!["Winter", "Spring", "Summer", "Autumn"]);
        assert_eq!(learned(4).assign(&days).unwrap(), families);
    }

    #[test]
    fn test_new_year_family_sorts_last() {
        let mut days: Vec<f64> = (361..=365).chain(1..=5).map(|d| d as f64).collect();
        days.extend((175..=185).map(|d| d as f64));
        let families = learned(2).assign(&days).unwrap();
        // the summer centroid comes first; the new year one is near 365, not 0
        assert!(families[..10].iter().all(|f| f.id == 1 && f.name == "Winter"));
        assert!(families[10..].iter().all(|f| f.id == 0 && f.name == "Summer"));
    }

    #[test]
    fn test_learned_k_may_equal_heatwaves_with_shared_days() {
        let families = learned(4).assign(&[40.0, 40.0, 200.0, 300.0]).unwrap();
        assert_eq!(families.len(), 4);
        assert_eq!(families[0], families[1]);
        assert_ne!(families[2], families[3]);
        assert_ne!(families[0], families[2]);
    }

    #[test]
    fn test_learned_k_exceeding_heatwaves_fails() {
        assert!(matches!(
            learned(4).assign(&[100.0, 100.0, 200.0]),
            Err(HeatwaveError::TooManyClusters {
                requested: 4,
                available: 3,
                ..
            })
        ));
    }
}
