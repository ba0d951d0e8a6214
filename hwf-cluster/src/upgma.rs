//! Average-linkage (UPGMA) hierarchical clustering.
//!
//! Works on a condensed distance matrix: the upper triangle of an `n x n`
//! symmetric matrix, row by row, so the distance between `i < j` sits at
//! `n*i - i*(i+1)/2 + (j - i - 1)`. Merges are found with the
//! nearest-neighbour chain algorithm, which is exact for average linkage,
//! then sorted by distance and renumbered so cluster `n + m` is the one
//! created by merge `m`.

use hwf_core::error::{HeatwaveError, Result};
use hwf_data::labeler::DisjointSet;
use std::collections::HashMap;

/// Position of pair `(i, j)`, `i != j`, in a condensed matrix over `n` items.
pub fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    let (i, j) = if i < j { (i, j) } else { (j, i) };
    n * i - i * (i + 1) / 2 + (j - i - 1)
}

/// One agglomeration step. Ids below `n` are leaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    n: usize,
    merges: Vec<Merge>,
}

impl Dendrogram {
    /// Build the average-linkage tree over `n` items.
    pub fn average(n: usize, condensed: &[f64]) -> Result<Self> {
        let expected = n * n.saturating_sub(1) / 2;
        if condensed.len() != expected {
            return Err(HeatwaveError::InvalidConfig(format!(
                "condensed matrix over {} items needs {} distances, got {}",
                n,
                expected,
                condensed.len()
            )));
        }

        let mut dist = vec![0.0; n * n];
        for i in 0..n {
            for j in i + 1..n {
                let d = condensed[condensed_index(n, i, j)];
                dist[i * n + j] = d;
                dist[j * n + i] = d;
            }
        }

        // slot-level merges in discovery order: (a, b, distance)
        let mut found: Vec<(usize, usize, f64)> = Vec::with_capacity(n.saturating_sub(1));
        let mut size = vec![1usize; n];
        let mut active = vec![true; n];
        let mut chain: Vec<usize> = Vec::new();

        while found.len() + 1 < n {
            if chain.is_empty() {
                if let Some(first) = active.iter().position(|&a| a) {
                    chain.push(first);
                }
            }
            let (a, b, d) = loop {
                let a = chain[chain.len() - 1];
                let previous = chain.len().checked_sub(2).map(|i| chain[i]);
                // the previous link wins ties, which guarantees termination
                let mut best = previous.map(|p| (p, dist[a * n + p]));
                for c in (0..n).filter(|&c| active[c] && c != a) {
                    let d = dist[a * n + c];
                    if best.map_or(true, |(_, bd)| d < bd) {
                        best = Some((c, d));
                    }
                }
                let Some((b, d)) = best else {
                    return Err(HeatwaveError::InvalidConfig(
                        "no active cluster left to merge".to_string(),
                    ));
                };
                if Some(b) == previous {
                    break (a, b, d);
                }
                chain.push(b);
            };
            chain.truncate(chain.len() - 2);

            // keep the merged cluster in slot `b`
            let (sa, sb) = (size[a] as f64, size[b] as f64);
            for c in (0..n).filter(|&c| active[c] && c != a && c != b) {
                let merged = (sa * dist[c * n + a] + sb * dist[c * n + b]) / (sa + sb);
                dist[c * n + b] = merged;
                dist[b * n + c] = merged;
            }
            active[a] = false;
            size[b] += size[a];
            found.push((a.min(b), a.max(b), d));
        }

        found.sort_by(|x, y| x.2.total_cmp(&y.2));
        Ok(Dendrogram {
            n,
            merges: relabel(n, &found),
        })
    }

    pub fn n_leaves(&self) -> usize {
        self.n
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Flat labels with exactly `u` clusters.
    ///
    /// Applies the first `n - u` merges. Labels are numbered from 0 by
    /// descending cluster size, ties going to the cluster with the smallest
    /// member.
    pub fn cut(&self, u: usize) -> Result<Vec<u32>> {
        if u == 0 {
            return Err(HeatwaveError::InvalidConfig(
                "cannot cut a dendrogram into 0 clusters".to_string(),
            ));
        }
        if u > self.n {
            return Err(HeatwaveError::TooManyClusters {
                stage: "UPGMA cut".to_string(),
                requested: u,
                available: self.n,
            });
        }

        let mut set = DisjointSet::new(self.n);
        // a leaf standing in for every cluster id
        let mut representative: Vec<usize> = (0..self.n).collect();
        for merge in &self.merges[..self.n - u] {
            let (l, r) = (representative[merge.left], representative[merge.right]);
            set.union(l, r);
            representative.push(l);
        }

        let roots: Vec<usize> = (0..self.n).map(|i| set.find(i)).collect();
        let mut groups: HashMap<usize, (usize, usize)> = HashMap::new();
        for (i, &root) in roots.iter().enumerate() {
            groups.entry(root).or_insert((0, i)).0 += 1;
        }
        let mut order: Vec<(usize, usize, usize)> = groups
            .into_iter()
            .map(|(root, (count, first))| (root, count, first))
            .collect();
        order.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        let mut label_of = vec![0u32; self.n];
        for (label, &(root, _, _)) in order.iter().enumerate() {
            label_of[root] = label as u32;
        }

        Ok(roots.iter().map(|&root| label_of[root]).collect())
    }
}

/// Turn slot-level merges (already sorted by distance) into cluster-id merges.
fn relabel(n: usize, found: &[(usize, usize, f64)]) -> Vec<Merge> {
    let mut set = DisjointSet::new(n);
    // cluster id and size held by each union-find root
    let mut cluster_of: Vec<usize> = (0..n).collect();
    let mut size_of = vec![1usize; n];
    let mut merges = Vec::with_capacity(found.len());
    for (m, &(a, b, distance)) in found.iter().enumerate() {
        let (ra, rb) = (set.find(a), set.find(b));
        let (ca, cb) = (cluster_of[ra], cluster_of[rb]);
        let size = size_of[ra] + size_of[rb];
        set.union(ra, rb);
        let root = set.find(ra);
        cluster_of[root] = n + m;
        size_of[root] = size;
        merges.push(Merge {
            left: ca.min(cb),
            right: ca.max(cb),
            distance,
            size,
        });
    }
    merges
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Condensed matrix from points on a line.
    fn line(points: &[f64]) -> Vec<f64> {
        let n = points.len();
        let mut condensed = Vec::new();
        for i in 0..n {
            for j in i + 1..n {
                condensed.push((points[i] - points[j]).abs());
            }
        }
        condensed
    }

    #[test]
    fn test_condensed_index() {
        let n = 4;
        let pairs: Vec<usize> = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]
            .iter()
            .map(|&(i, j)| condensed_index(n, i, j))
            .collect();
        assert_eq!(pairs, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(condensed_index(n, 3, 1), 4);
    }

    #[test]
    fn test_average_linkage_heights() {
        // 0, 1 merge at 1; 10 joins 12 at 2; then the groups at mean distance
        let tree = Dendrogram::average(4, &line(&[0.0, 1.0, 10.0, 12.0])).unwrap();
        let merges = tree.merges();
        assert_eq!(merges.len(), 3);
        assert_eq!((merges[0].left, merges[0].right, merges[0].distance), (0, 1, 1.0));
        assert_eq!((merges[1].left, merges[1].right, merges[1].distance), (2, 3, 2.0));
        assert_eq!((merges[2].left, merges[2].right), (4, 5));
        // (10 + 12 + 9 + 11) / 4
        assert!((merges[2].distance - 10.5).abs() < 1e-12);
        assert_eq!(merges[2].size, 4);
    }

    #[test]
    fn test_cut_yields_exactly_u_clusters() {
        let tree = Dendrogram::average(6, &line(&[0.0, 0.5, 1.0, 10.0, 10.5, 30.0])).unwrap();
        assert_eq!(tree.cut(1).unwrap(), vec![0; 6]);
        assert_eq!(tree.cut(2).unwrap(), vec![0, 0, 0, 0, 0, 1]);
        assert_eq!(tree.cut(3).unwrap(), vec![0, 0, 0, 1, 1, 2]);
        assert_eq!(tree.cut(6).unwrap().len(), 6);

        // all-equal distances still cut into exactly u clusters
        let flat = Dendrogram::average(5, &[1.0; 10]).unwrap();
        for u in 1..=5 {
            let labels = flat.cut(u).unwrap();
            let mut distinct = labels.clone();
            distinct.sort();
            distinct.dedup();
            assert_eq!(distinct.len(), u);
        }
    }

    #[test]
    fn test_cut_bounds() {
        let tree = Dendrogram::average(3, &line(&[0.0, 1.0, 2.0])).unwrap();
        assert!(matches!(
            tree.cut(4),
            Err(HeatwaveError::TooManyClusters {
                requested: 4,
                available: 3,
                ..
            })
        ));
        assert!(tree.cut(0).is_err());
        assert!(Dendrogram::average(3, &[1.0]).is_err());
    }

    #[test]
    fn test_single_leaf() {
        let tree = Dendrogram::average(1, &[]).unwrap();
        assert!(tree.merges().is_empty());
        assert_eq!(tree.cut(1).unwrap(), vec![0]);
    }
}
