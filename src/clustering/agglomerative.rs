//! Bottom-up hierarchical clustering on a precomputed affinity matrix.
//!
//! # Algorithm
//!
//! Affinities are converted to dissimilarities (`max(S) − S_ij`). Every
//! point starts as its own cluster; the closest pair of clusters is merged
//! repeatedly until `k` remain. Inter-cluster distances are maintained with
//! the Lance–Williams update for the chosen linkage:
//!
//! ```text
//! complete: d(a∪b, x) = max(d(a,x), d(b,x))
//! single:   d(a∪b, x) = min(d(a,x), d(b,x))
//! average:  d(a∪b, x) = (|a|·d(a,x) + |b|·d(b,x)) / (|a| + |b|)
//! ```
//!
//! Ties are broken toward the lowest cluster indices, and labels are
//! numbered in order of each cluster's first member, so the result is fully
//! deterministic.
//!
//! # Complexity
//!
//! O(n³) time, O(n²) memory.

use serde::{Deserialize, Serialize};

use super::strategy::{check_cluster_count, ClusteringStrategy, Partition};
use crate::error::Result;
use crate::similarity::SimilarityMatrix;

/// Inter-cluster distance rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    /// Maximum pairwise distance between members.
    #[default]
    Complete,
    /// Minimum pairwise distance between members.
    Single,
    /// Mean pairwise distance between members.
    Average,
}

impl Linkage {
    fn merge(self, d_a: f64, d_b: f64, size_a: usize, size_b: usize) -> f64 {
        match self {
            Linkage::Complete => d_a.max(d_b),
            Linkage::Single => d_a.min(d_b),
            Linkage::Average => {
                (size_a as f64 * d_a + size_b as f64 * d_b) / (size_a + size_b) as f64
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgglomerativeConfig {
    pub linkage: Linkage,
}

impl AgglomerativeConfig {
    /// Sets the inter-cluster distance rule.
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }
}

/// Precomputed-affinity hierarchical clustering (complete linkage by default).
#[derive(Debug, Clone, Default)]
pub struct AgglomerativeClustering {
    config: AgglomerativeConfig,
}

impl AgglomerativeClustering {
    /// Creates a strategy with the given linkage settings.
    pub fn new(config: AgglomerativeConfig) -> Self {
        Self { config }
    }

    /// Returns the active settings.
    pub fn config(&self) -> &AgglomerativeConfig {
        &self.config
    }
}

impl ClusteringStrategy for AgglomerativeClustering {
    fn name(&self) -> &'static str {
        "agglomerative"
    }

    fn partition(&self, similarity: &SimilarityMatrix, k: usize) -> Result<Partition> {
        let n = similarity.size();
        check_cluster_count(n, k)?;

        let mut dist = similarity.to_dissimilarity().as_slice().to_vec();
        // owner[i] = representative cluster slot of point i
        let mut owner: Vec<usize> = (0..n).collect();
        let mut sizes = vec![1usize; n];
        let mut active = vec![true; n];
        let mut remaining = n;
        let mut merges = 0;

        while remaining > k {
            let mut best: Option<(usize, usize, f64)> = None;
            for a in (0..n).filter(|&a| active[a]) {
                for b in ((a + 1)..n).filter(|&b| active[b]) {
                    let d = dist[a * n + b];
                    if best.map_or(true, |(_, _, bd)| d < bd) {
                        best = Some((a, b, d));
                    }
                }
            }
            let Some((a, b, _)) = best else {
                break;
            };

            for x in (0..n).filter(|&x| active[x] && x != a && x != b) {
                let merged =
                    self.config
                        .linkage
                        .merge(dist[a * n + x], dist[b * n + x], sizes[a], sizes[b]);
                dist[a * n + x] = merged;
                dist[x * n + a] = merged;
            }
            for o in owner.iter_mut().filter(|o| **o == b) {
                *o = a;
            }
            sizes[a] += sizes[b];
            active[b] = false;
            remaining -= 1;
            merges += 1;
        }

        let mut slot_label: Vec<Option<usize>> = vec![None; n];
        let mut next = 0;
        let labels = owner
            .iter()
            .map(|&slot| {
                *slot_label[slot].get_or_insert_with(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect();

        Ok(Partition::new(labels, k, true, merges))
    }
}
