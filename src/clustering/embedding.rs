//! Embed-then-partition clustering: SMACOF into a low-dimensional space,
//! then k-means on the embedded coordinates.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::kmeans::KMeans;
use super::smacof::Smacof;
use super::strategy::{check_cluster_count, ClusteringStrategy, Partition};
use crate::error::{ClusterError, Result};
use crate::similarity::SimilarityMatrix;

/// Settings for [`EmbeddingKMeans`].
///
/// Both stages draw from a generator seeded with `seed`, so equal inputs and
/// equal configs always give equal labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingKMeansConfig {
    /// Embedding dimensionality.
    pub dimensions: usize,
    pub seed: u64,
    /// Random starts for the embedding; the lowest-stress one is kept.
    pub mds_restarts: usize,
    pub mds_max_iterations: usize,
    pub mds_tolerance: f64,
    pub kmeans_max_iterations: usize,
    pub kmeans_tolerance: f64,
}

impl Default for EmbeddingKMeansConfig {
    fn default() -> Self {
        Self {
            dimensions: 2,
            seed: 42,
            mds_restarts: 4,
            mds_max_iterations: 300,
            mds_tolerance: 1e-3,
            kmeans_max_iterations: 300,
            kmeans_tolerance: 1e-4,
        }
    }
}

impl EmbeddingKMeansConfig {
    /// Sets the embedding dimensionality.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Sets the seed shared by both stages.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets how many random starts the embedding tries.
    pub fn with_mds_restarts(mut self, restarts: usize) -> Self {
        self.mds_restarts = restarts;
        self
    }

    /// Caps the stress-majorization iterations per start.
    pub fn with_mds_max_iterations(mut self, n: usize) -> Self {
        self.mds_max_iterations = n;
        self
    }

    /// Caps the k-means refinement passes.
    pub fn with_kmeans_max_iterations(mut self, n: usize) -> Self {
        self.kmeans_max_iterations = n;
        self
    }

    /// Checks that every setting is usable.
    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(ClusterError::InvalidConfig(
                "embedding dimensions must be at least 1".into(),
            ));
        }
        if self.mds_restarts == 0 {
            return Err(ClusterError::InvalidConfig(
                "at least one embedding restart is required".into(),
            ));
        }
        for (name, tol) in [
            ("mds_tolerance", self.mds_tolerance),
            ("kmeans_tolerance", self.kmeans_tolerance),
        ] {
            if !tol.is_finite() || tol < 0.0 {
                return Err(ClusterError::InvalidConfig(format!(
                    "{name} must be a non-negative finite number, got {tol}"
                )));
            }
        }
        Ok(())
    }
}

/// Clusters by embedding the dissimilarities with SMACOF and running
/// k-means++ on the result.
///
/// # Examples
///
/// ```
/// use u_cluster::clustering::{ClusteringStrategy, EmbeddingKMeans, EmbeddingKMeansConfig};
/// use u_cluster::similarity::SimilarityMatrix;
///
/// let s = SimilarityMatrix::from_data(4, vec![
///     1.0, 0.9, 0.0, 0.1,
///     0.9, 1.0, 0.1, 0.0,
///     0.0, 0.1, 1.0, 0.9,
///     0.1, 0.0, 0.9, 1.0,
/// ]).unwrap();
/// let strategy = EmbeddingKMeans::new(EmbeddingKMeansConfig::default()).unwrap();
/// let p = strategy.partition(&s, 2).unwrap();
/// assert_eq!(p.labels()[0], p.labels()[1]);
/// assert_eq!(p.labels()[2], p.labels()[3]);
/// assert_ne!(p.labels()[0], p.labels()[2]);
/// ```
#[derive(Debug, Clone)]
pub struct EmbeddingKMeans {
    config: EmbeddingKMeansConfig,
}

impl EmbeddingKMeans {
    /// # Errors
    ///
    /// [`ClusterError::InvalidConfig`] if the config fails validation.
    pub fn new(config: EmbeddingKMeansConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the active settings.
    pub fn config(&self) -> &EmbeddingKMeansConfig {
        &self.config
    }
}

impl ClusteringStrategy for EmbeddingKMeans {
    fn name(&self) -> &'static str {
        "embedding-kmeans"
    }

    fn partition(&self, similarity: &SimilarityMatrix, k: usize) -> Result<Partition> {
        let n = similarity.size();
        check_cluster_count(n, k)?;
        if n == 0 {
            return Ok(Partition::new(Vec::new(), k, true, 0));
        }

        let c = &self.config;
        let embedding = Smacof {
            dimensions: c.dimensions,
            max_iterations: c.mds_max_iterations,
            tolerance: c.mds_tolerance,
            restarts: c.mds_restarts,
            seed: c.seed,
        }
        .embed(&similarity.to_dissimilarity());
        debug!(
            stress = embedding.stress,
            iterations = embedding.iterations,
            "embedding computed"
        );
        if !embedding.converged {
            warn!(
                iterations = embedding.iterations,
                stress = embedding.stress,
                "embedding hit iteration cap before converging"
            );
        }

        let fit = KMeans {
            max_iterations: c.kmeans_max_iterations,
            tolerance: c.kmeans_tolerance,
            seed: c.seed,
        }
        .fit(&embedding.coords, c.dimensions, k)?;
        if !fit.converged {
            warn!(iterations = fit.iterations, "k-means hit iteration cap before converging");
        }

        Ok(Partition::new(
            fit.labels,
            k,
            embedding.converged && fit.converged,
            fit.iterations,
        ))
    }
}
