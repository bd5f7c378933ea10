//! Strategy interface shared by the clustering backends.

use serde::{Deserialize, Serialize};

use super::agglomerative::{AgglomerativeClustering, AgglomerativeConfig};
use super::embedding::{EmbeddingKMeans, EmbeddingKMeansConfig};
use crate::error::{ClusterError, Result};
use crate::similarity::SimilarityMatrix;

/// A label assignment produced by a [`ClusteringStrategy`].
///
/// Holds one label in `0..num_clusters` per point, in point order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    labels: Vec<usize>,
    num_clusters: usize,
    converged: bool,
    iterations: usize,
}

impl Partition {
    /// Wraps an externally computed assignment, checking every label is
    /// below `num_clusters`.
    pub fn from_labels(labels: Vec<usize>, num_clusters: usize) -> Result<Self> {
        if let Some((i, &l)) = labels.iter().enumerate().find(|&(_, &l)| l >= num_clusters) {
            return Err(ClusterError::InvalidLabels(format!(
                "point {i} has label {l}, expected below {num_clusters}"
            )));
        }
        Ok(Self::new(labels, num_clusters, true, 0))
    }

    pub(crate) fn new(
        labels: Vec<usize>,
        num_clusters: usize,
        converged: bool,
        iterations: usize,
    ) -> Self {
        Self {
            labels,
            num_clusters,
            converged,
            iterations,
        }
    }

    /// Labels in point order.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Requested cluster count `k`.
    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    /// `false` when an iteration cap stopped the algorithm early; the labels
    /// are then the best assignment reached.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Merges or refinement passes performed.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Number of labelled points.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Partitions points given their pairwise affinities.
///
/// Implementations are pure: they read the similarity matrix and return
/// labels without touching point state.
///
/// # Examples
///
/// ```
/// use u_cluster::clustering::{AgglomerativeClustering, ClusteringStrategy};
/// use u_cluster::similarity::SimilarityMatrix;
///
/// let s = SimilarityMatrix::from_data(3, vec![
///     1.0, 0.9, 0.1,
///     0.9, 1.0, 0.2,
///     0.1, 0.2, 1.0,
/// ]).unwrap();
/// let partition = AgglomerativeClustering::default().partition(&s, 2).unwrap();
/// assert_eq!(partition.labels(), &[0, 0, 1]);
/// ```
pub trait ClusteringStrategy: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Assigns each of the N points a label in `0..k`.
    ///
    /// # Errors
    ///
    /// [`ClusterError::InvalidClusterCount`] if `k` is zero or exceeds N
    /// (N > 0).
    fn partition(&self, similarity: &SimilarityMatrix, k: usize) -> Result<Partition>;
}

/// Serializable choice of clustering backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ClusteringMethod {
    Agglomerative(AgglomerativeConfig),
    EmbeddingKMeans(EmbeddingKMeansConfig),
}

impl ClusteringMethod {
    /// Instantiates the configured strategy.
    pub fn build(&self) -> Result<Box<dyn ClusteringStrategy>> {
        Ok(match self {
            ClusteringMethod::Agglomerative(c) => Box::new(AgglomerativeClustering::new(c.clone())),
            ClusteringMethod::EmbeddingKMeans(c) => Box::new(EmbeddingKMeans::new(c.clone())?),
        })
    }
}

impl Default for ClusteringMethod {
    fn default() -> Self {
        ClusteringMethod::Agglomerative(AgglomerativeConfig::default())
    }
}

/// Rejects cluster counts that cannot partition `points` points.
pub(crate) fn check_cluster_count(points: usize, k: usize) -> Result<()> {
    if points > 0 && (k == 0 || k > points) {
        return Err(ClusterError::InvalidClusterCount { k, points });
    }
    Ok(())
}
