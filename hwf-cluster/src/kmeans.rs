//! Seeded k-means over small fixed-dimension points.
//!
//! k-means++ seeding followed by Lloyd iterations, repeated `restarts` times
//! with the lowest-inertia run kept. Every random draw comes from one
//! `ChaCha8Rng` seeded with the caller's seed, so a fit is reproducible.

use hwf_core::error::{HeatwaveError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KMeans {
    pub k: usize,
    pub seed: u64,
    pub restarts: usize,
    pub max_iter: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit<const D: usize> {
    pub centroids: Vec<[f64; D]>,
    /// Cluster index of every input point
    pub assignments: Vec<usize>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
}

impl<const D: usize> KMeansFit<D> {
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &a in &self.assignments {
            sizes[a] += 1;
        }
        sizes
    }
}

fn squared_distance<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index and squared distance of the nearest centroid; ties go to the lower index.
fn nearest<const D: usize>(point: &[f64; D], centroids: &[[f64; D]]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

/// Number of distinct points, compared bit for bit.
pub fn distinct_points<const D: usize>(points: &[[f64; D]]) -> usize {
    let mut keys: Vec<[u64; D]> = points.iter().map(|p| p.map(f64::to_bits)).collect();
    keys.sort_unstable();
    keys.dedup();
    keys.len()
}

impl KMeans {
    pub fn fit<const D: usize>(&self, points: &[[f64; D]]) -> Result<KMeansFit<D>> {
        if self.k == 0 || self.restarts == 0 || self.max_iter == 0 {
            return Err(HeatwaveError::InvalidConfig(format!(
                "k-means needs k, restarts and max_iter >= 1 (got {}, {}, {})",
                self.k, self.restarts, self.max_iter
            )));
        }
        if self.k > points.len() {
            return Err(HeatwaveError::TooManyClusters {
                stage: "k-means".to_string(),
                requested: self.k,
                available: points.len(),
            });
        }
        let distinct = distinct_points(points);
        if self.k > distinct {
            log::warn!(
                "k-means: k = {} exceeds {} distinct points; some clusters stay empty",
                self.k,
                distinct
            );
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit<D>> = None;
        for run in 0..self.restarts {
            let seeds = self.plus_plus(points, &mut rng);
            let fit = self.lloyd(points, seeds);
            log::debug!("k-means: run {} inertia {:.6}", run, fit.inertia);
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }
        best.ok_or_else(|| HeatwaveError::InvalidConfig("k-means ran no restarts".to_string()))
    }

    /// k-means++ seeding: each new centre is drawn with probability
    /// proportional to its squared distance from the nearest chosen centre.
    fn plus_plus<const D: usize>(
        &self,
        points: &[[f64; D]],
        rng: &mut ChaCha8Rng,
    ) -> Vec<[f64; D]> {
        let mut centroids = Vec::with_capacity(self.k);
        centroids.push(points[rng.gen_range(0..points.len())]);
        let mut weights: Vec<f64> = points
            .iter()
            .map(|p| squared_distance(p, &centroids[0]))
            .collect();
        while centroids.len() < self.k {
            let total: f64 = weights.iter().sum();
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = None;
            for (i, &w) in weights.iter().enumerate() {
                if w <= 0.0 {
                    continue;
                }
                chosen = Some(i);
                if target < w {
                    break;
                }
                target -= w;
            }
            // every distinct point is already a centre: repeat a random one
            let centre = match chosen {
                Some(i) => points[i],
                None => centroids[rng.gen_range(0..centroids.len())],
            };
            centroids.push(centre);
            for (w, p) in weights.iter_mut().zip(points) {
                *w = w.min(squared_distance(p, &centre));
            }
        }
        centroids
    }

    fn lloyd<const D: usize>(
        &self,
        points: &[[f64; D]],
        mut centroids: Vec<[f64; D]>,
    ) -> KMeansFit<D> {
        let k = centroids.len();
        let mut assignments = vec![usize::MAX; points.len()];
        for _ in 0..self.max_iter {
            let mut changed = false;
            for (a, p) in assignments.iter_mut().zip(points) {
                let (i, _) = nearest(p, &centroids);
                if *a != i {
                    *a = i;
                    changed = true;
                }
            }
            if !changed {
                break;
            }

            let mut sums = vec![[0.0; D]; k];
            let mut counts = vec![0usize; k];
            for (&a, p) in assignments.iter().zip(points) {
                counts[a] += 1;
                for (s, v) in sums[a].iter_mut().zip(p) {
                    *s += v;
                }
            }
            for c in 0..k {
                if counts[c] > 0 {
                    centroids[c] = sums[c].map(|s| s / counts[c] as f64);
                    continue;
                }
                // empty cluster: move it onto the point worst served by its
                // centroid, unless every point already sits on one
                let far = points
                    .iter()
                    .zip(&assignments)
                    .map(|(p, &a)| squared_distance(p, &centroids[a]))
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (i, d)| {
                        if d > best.1 {
                            (i, d)
                        } else {
                            best
                        }
                    });
                if far.1 > 0.0 {
                    centroids[c] = points[far.0];
                    assignments[far.0] = c;
                }
            }
        }

        // final assignment against the final centroids
        let mut inertia = 0.0;
        for (a, p) in assignments.iter_mut().zip(points) {
            let (i, d) = nearest(p, &centroids);
            *a = i;
            inertia += d;
        }
        KMeansFit {
            centroids,
            assignments,
            inertia,
        }
    }
}
