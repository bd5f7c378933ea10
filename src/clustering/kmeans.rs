//! Lloyd's k-means with k-means++ seeding.
//!
//! # Algorithm
//!
//! 1. Seed centroids with k-means++: the first uniformly, each next one with
//!    probability proportional to its squared distance from the nearest
//!    chosen centroid.
//! 2. Alternate nearest-centroid assignment and centroid recomputation until
//!    assignments stop changing, the total centroid shift falls below the
//!    tolerance, or the iteration cap is hit.
//!
//! Empty clusters are refilled with the point lying farthest from its own
//! centroid (taken from a cluster with at least two members), so every label
//! is used whenever `n ≥ k`.
//!
//! # Reference
//!
//! Arthur, D. & Vassilvitskii, S. (2007). "k-means++: The Advantages of
//! Careful Seeding", *SODA '07*, 1027-1035.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::strategy::check_cluster_count;
use crate::error::{ClusterError, Result};

/// Result of a k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    pub labels: Vec<usize>,
    /// Row-major `k × dimensions` centroids.
    pub centroids: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// k-means settings.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub max_iterations: usize,
    /// Total squared centroid shift below which iteration stops.
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

impl KMeans {
    /// Clusters the `n = data.len() / dim` row-major points into `k` groups.
    ///
    /// No points yield an empty result.
    ///
    /// # Errors
    ///
    /// - [`ClusterError::InvalidConfig`] if `dim` is zero
    /// - [`ClusterError::DimensionMismatch`] if `data.len()` is not a multiple of `dim`
    /// - [`ClusterError::InvalidClusterCount`] if `k` is zero or exceeds `n` (n > 0)
    pub fn fit(&self, data: &[f64], dim: usize, k: usize) -> Result<KMeansResult> {
        if dim == 0 {
            return Err(ClusterError::InvalidConfig(
                "k-means dimensions must be at least 1".into(),
            ));
        }
        if data.len() % dim != 0 {
            return Err(ClusterError::DimensionMismatch {
                expected: data.len() / dim * dim + dim,
                actual: data.len(),
            });
        }
        let n = data.len() / dim;
        check_cluster_count(n, k)?;
        if n == 0 {
            return Ok(KMeansResult {
                labels: Vec::new(),
                centroids: Vec::new(),
                iterations: 0,
                converged: true,
            });
        }
        let row = |i: usize| &data[i * dim..(i + 1) * dim];

        let mut centroids = self.seed_centroids(data, dim, k);
        let mut labels = assign(data, dim, &centroids, k);
        repair_empty(data, dim, &centroids, k, &mut labels);

        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.max_iterations {
            iterations += 1;

            let mut next = vec![0.0; k * dim];
            let mut counts = vec![0usize; k];
            for i in 0..n {
                let c = labels[i];
                counts[c] += 1;
                for (acc, v) in next[c * dim..(c + 1) * dim].iter_mut().zip(row(i)) {
                    *acc += v;
                }
            }
            for c in 0..k {
                if counts[c] == 0 {
                    next[c * dim..(c + 1) * dim].copy_from_slice(&centroids[c * dim..(c + 1) * dim]);
                    continue;
                }
                for v in &mut next[c * dim..(c + 1) * dim] {
                    *v /= counts[c] as f64;
                }
            }
            let shift = squared_distance(&centroids, &next);
            centroids = next;

            let mut relabeled = assign(data, dim, &centroids, k);
            repair_empty(data, dim, &centroids, k, &mut relabeled);
            let stable = relabeled == labels;
            labels = relabeled;
            if stable || shift <= self.tolerance {
                converged = true;
                break;
            }
        }

        Ok(KMeansResult {
            labels,
            centroids,
            iterations,
            converged,
        })
    }

    fn seed_centroids(&self, data: &[f64], dim: usize, k: usize) -> Vec<f64> {
        let n = data.len() / dim;
        let row = |i: usize| &data[i * dim..(i + 1) * dim];
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut chosen = vec![rng.random_range(0..n)];
        let mut nearest: Vec<f64> = (0..n)
            .map(|i| squared_distance(row(i), row(chosen[0])))
            .collect();

        while chosen.len() < k {
            let total: f64 = nearest.iter().sum();
            let pick = if total > 0.0 {
                let mut target = rng.random::<f64>() * total;
                let mut pick = n - 1;
                for (i, &w) in nearest.iter().enumerate() {
                    if w > 0.0 && target < w {
                        pick = i;
                        break;
                    }
                    target -= w;
                }
                if nearest[pick] <= 0.0 {
                    pick = nearest.iter().rposition(|&w| w > 0.0).unwrap_or(pick);
                }
                pick
            } else {
                // Every point coincides with a centroid; take the lowest unused index.
                (0..n).find(|i| !chosen.contains(i)).unwrap_or(0)
            };
            chosen.push(pick);
            for (i, w) in nearest.iter_mut().enumerate() {
                *w = w.min(squared_distance(row(i), row(pick)));
            }
        }

        chosen.iter().flat_map(|&i| row(i).iter().copied()).collect()
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Nearest centroid per point; ties go to the lowest centroid index.
fn assign(data: &[f64], dim: usize, centroids: &[f64], k: usize) -> Vec<usize> {
    data.chunks_exact(dim)
        .map(|x| {
            let mut best = 0;
            let mut best_d = f64::INFINITY;
            for c in 0..k {
                let d = squared_distance(x, &centroids[c * dim..(c + 1) * dim]);
                if d < best_d {
                    best = c;
                    best_d = d;
                }
            }
            best
        })
        .collect()
}

fn repair_empty(data: &[f64], dim: usize, centroids: &[f64], k: usize, labels: &mut [usize]) {
    let mut counts = vec![0usize; k];
    for &l in labels.iter() {
        counts[l] += 1;
    }
    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let donor = labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| counts[l] > 1)
            .map(|(i, &l)| {
                let x = &data[i * dim..(i + 1) * dim];
                (i, squared_distance(x, &centroids[l * dim..(l + 1) * dim]))
            })
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            });
        if let Some((i, _)) = donor {
            counts[labels[i]] -= 1;
            labels[i] = empty;
            counts[empty] = 1;
        }
    }
}
