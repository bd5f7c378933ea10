//! One clustering run end to end.
//!
//! ```text
//! points ──acquire──▶ DistanceMatrix ──compose──▶ SimilarityMatrix
//!        ──partition──▶ Partition ──assemble──▶ Vec<Cluster>
//! ```
//!
//! The run holds the [`PointStore`] write guard from the first provider
//! request until the cluster ids are written, so concurrent runs on the
//! same collection are serialized.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::assembly::{assemble, PointStore};
use crate::clustering::{ClusteringMethod, ClusteringStrategy};
use crate::error::{ClusterError, Result};
use crate::models::{Cluster, Depot, Point, Priority};
use crate::provider::{MatrixRoutingService, RoutingMatrixProvider};
use crate::similarity::compose;

/// Settings for a clustering run.
///
/// `distance_weight` and `priority_weight` are applied as given and are not
/// rescaled to sum to one. The blended score is an affinity in which travel
/// cost counts toward belonging together (see [`compose`]), so under the
/// default 0.8/0.2 split points of equal priority that lie far apart tend to
/// share a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Requested cluster count `k`.
    pub num_clusters: usize,
    pub distance_weight: f64,
    pub priority_weight: f64,
    pub method: ClusteringMethod,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_clusters: 1,
            distance_weight: 0.8,
            priority_weight: 0.2,
            method: ClusteringMethod::default(),
        }
    }
}

impl PipelineConfig {
    /// Sets the requested cluster count `k`.
    pub fn with_num_clusters(mut self, k: usize) -> Self {
        self.num_clusters = k;
        self
    }

    /// Sets the distance and priority weights, used as given.
    pub fn with_weights(mut self, distance_weight: f64, priority_weight: f64) -> Self {
        self.distance_weight = distance_weight;
        self.priority_weight = priority_weight;
        self
    }

    /// Selects the clustering backend.
    pub fn with_method(mut self, method: ClusteringMethod) -> Self {
        self.method = method;
        self
    }

    /// Rejects a zero cluster count and non-finite weights.
    pub fn validate(&self) -> Result<()> {
        if self.num_clusters == 0 {
            return Err(ClusterError::InvalidConfig(
                "num_clusters must be positive".into(),
            ));
        }
        if !self.distance_weight.is_finite() || !self.priority_weight.is_finite() {
            return Err(ClusterError::InvalidConfig(format!(
                "similarity weights must be finite, got {} and {}",
                self.distance_weight, self.priority_weight
            )));
        }
        Ok(())
    }
}

/// Orchestrates acquisition, similarity composition, partitioning, and
/// assembly.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use u_cluster::assembly::PointStore;
/// use u_cluster::models::{Depot, Point, Priority};
/// use u_cluster::pipeline::{ClusterManager, PipelineConfig};
/// use u_cluster::provider::{BackoffPolicy, GreatCircleService, ProviderConfig, RoutingMatrixProvider};
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let store = PointStore::new(vec![
///     Point::new(0, 52.00, 4.00, Priority::default()),
///     Point::new(1, 52.00, 4.01, Priority::default()),
///     Point::new(2, 53.00, 6.00, Priority::default()),
/// ]).unwrap();
/// let provider = RoutingMatrixProvider::new(
///     GreatCircleService::new(100),
///     ProviderConfig::default()
///         .with_inter_request_delay(Duration::ZERO)
///         .with_backoff(BackoffPolicy::fixed(Duration::from_millis(1))),
/// ).unwrap();
/// let manager = ClusterManager::new(provider, PipelineConfig::default().with_num_clusters(2)).unwrap();
///
/// let clusters = manager.build_clusters(&store, Arc::new(Depot::new("WH", 52.0, 4.5))).await.unwrap();
/// assert_eq!(clusters.len(), 2);
/// assert!(store.read().await.iter().all(|p| p.cluster_id().is_some()));
/// # });
/// ```
pub struct ClusterManager<S> {
    provider: RoutingMatrixProvider<S>,
    strategy: Box<dyn ClusteringStrategy>,
    config: PipelineConfig,
}

impl<S: MatrixRoutingService + 'static> ClusterManager<S> {
    /// Creates a manager using the strategy named by `config.method`.
    pub fn new(provider: RoutingMatrixProvider<S>, config: PipelineConfig) -> Result<Self> {
        let strategy = config.method.build()?;
        Self::with_strategy(provider, strategy, config)
    }

    /// Creates a manager with an explicit strategy; `config.method` is
    /// ignored.
    pub fn with_strategy(
        provider: RoutingMatrixProvider<S>,
        strategy: Box<dyn ClusteringStrategy>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            strategy,
            config,
        })
    }

    /// Returns the run settings.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the matrix provider.
    pub fn provider(&self) -> &RoutingMatrixProvider<S> {
        &self.provider
    }

    /// Returns the clustering strategy in use.
    pub fn strategy(&self) -> &dyn ClusteringStrategy {
        self.strategy.as_ref()
    }

    /// Runs the pipeline over `store` and returns `num_clusters` clusters
    /// anchored at `depot`.
    ///
    /// Cluster ids on the points are written only after every earlier stage
    /// succeeded; on error they keep their values from the previous run.
    #[instrument(skip_all, fields(strategy = self.strategy.name(), k = self.config.num_clusters))]
    pub async fn build_clusters(&self, store: &PointStore, depot: Arc<Depot>) -> Result<Vec<Cluster>> {
        let mut points = store.write().await;
        let k = self.config.num_clusters;
        info!(points = points.len(), depot = depot.id(), "clustering run started");

        let distances = self.provider.acquire(&points).await?;
        let priorities: Vec<Priority> = points.iter().map(Point::priority).collect();
        let similarity = compose(
            &distances,
            &priorities,
            self.config.distance_weight,
            self.config.priority_weight,
        )?;

        let partition = self.strategy.partition(&similarity, k)?;
        let clusters = assemble(&mut points, &partition, depot)?;
        info!(
            clusters = clusters.len(),
            converged = partition.converged(),
            iterations = partition.iterations(),
            "clustering run finished"
        );
        Ok(clusters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::clustering::{AgglomerativeClustering, EmbeddingKMeansConfig};
    use crate::models::Coordinate;
    use crate::provider::{
        BackoffPolicy, CostRecord, GreatCircleService, JobId, JobStatus, ProviderConfig,
    };

    fn fast() -> ProviderConfig {
        ProviderConfig::default()
            .with_inter_request_delay(Duration::ZERO)
            .with_backoff(BackoffPolicy::fixed(Duration::from_millis(1)))
    }

    fn point(i: usize, lat: f64, lon: f64, prio: u8) -> Point {
        Point::new(i, lat, lon, Priority::new(prio).expect("valid"))
    }

    fn depot() -> Arc<Depot> {
        Arc::new(Depot::new("WH", 52.0, 4.5))
    }

    fn manager(config: PipelineConfig) -> ClusterManager<GreatCircleService> {
        let provider = RoutingMatrixProvider::new(GreatCircleService::new(100), fast()).expect("valid");
        ClusterManager::new(provider, config).expect("valid")
    }

    /// Rejects every submission.
    struct Unavailable;

    #[async_trait]
    impl MatrixRoutingService for Unavailable {
        async fn submit(&self, _: &[Coordinate], _: &[Coordinate]) -> Result<JobId> {
            Err(ClusterError::Submission {
                status: 503,
                body: "service unavailable".into(),
            })
        }

        async fn status(&self, _: &JobId) -> Result<JobStatus> {
            Ok(JobStatus::Pending)
        }

        async fn fetch(&self, _: &JobId) -> Result<Vec<CostRecord>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_priority_and_distance_blend() {
        // Points 2 and 3 are close and share priority 3; point 1 is far.
        let store = PointStore::new(vec![
            point(0, 52.0, 5.0, 0),
            point(1, 52.0, 4.0, 3),
            point(2, 52.0, 4.01, 3),
        ])
        .expect("valid");
        let m = manager(
            PipelineConfig::default()
                .with_num_clusters(2)
                .with_weights(0.5, 0.5),
        );

        let clusters = m.build_clusters(&store, depot()).await.expect("valid");
        let mut groups: Vec<Vec<usize>> = clusters.iter().map(Cluster::member_indices).collect();
        groups.sort();
        assert_eq!(groups, vec![vec![0], vec![1, 2]]);

        let points = store.read().await;
        assert_eq!(points[1].cluster_id(), points[2].cluster_id());
        assert_ne!(points[0].cluster_id(), points[1].cluster_id());
    }

    #[tokio::test]
    async fn test_failure_leaves_cluster_ids_untouched() {
        let store = PointStore::new(vec![
            point(0, 52.0, 4.0, 1),
            point(1, 52.1, 4.0, 1),
            point(2, 53.0, 5.0, 2),
        ])
        .expect("valid");
        manager(PipelineConfig::default().with_num_clusters(2))
            .build_clusters(&store, depot())
            .await
            .expect("valid");
        let before: Vec<_> = store.read().await.iter().map(Point::cluster_id).collect();
        assert!(before.iter().all(Option::is_some));

        let provider = RoutingMatrixProvider::new(Unavailable, fast()).expect("valid");
        let failing =
            ClusterManager::new(provider, PipelineConfig::default().with_num_clusters(3)).expect("valid");
        let err = failing.build_clusters(&store, depot()).await.unwrap_err();
        assert!(matches!(err, ClusterError::Submission { status: 503, .. }));

        let after: Vec<_> = store.read().await.iter().map(Point::cluster_id).collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_assignment() {
        let store = PointStore::new(vec![
            point(0, 52.0, 4.0, 0),
            point(1, 52.0, 4.2, 0),
            point(2, 52.0, 4.4, 0),
            point(3, 52.0, 4.6, 0),
        ])
        .expect("valid");

        manager(PipelineConfig::default().with_num_clusters(4))
            .build_clusters(&store, depot())
            .await
            .expect("valid");
        let mut ids: Vec<_> = store.read().await.iter().filter_map(Point::cluster_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3]);

        let clusters = manager(PipelineConfig::default().with_num_clusters(1))
            .build_clusters(&store, depot())
            .await
            .expect("valid");
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 4);
        assert!(store.read().await.iter().all(|p| p.cluster_id() == Some(0)));
    }

    #[tokio::test]
    async fn test_embedding_method_is_reproducible() {
        let points: Vec<Point> = (0..8)
            .map(|i| point(i, 52.0 + (i % 2) as f64, 4.0 + (i / 2) as f64 * 0.3, (i % 4) as u8))
            .collect();
        let config = PipelineConfig::default()
            .with_num_clusters(3)
            .with_method(ClusteringMethod::EmbeddingKMeans(EmbeddingKMeansConfig::default()));

        let first = PointStore::new(points.clone()).expect("valid");
        let second = PointStore::new(points).expect("valid");
        let a = manager(config.clone()).build_clusters(&first, depot()).await.expect("valid");
        let b = manager(config).build_clusters(&second, depot()).await.expect("valid");

        let indices = |cs: &[Cluster]| cs.iter().map(Cluster::member_indices).collect::<Vec<_>>();
        assert_eq!(indices(&a), indices(&b));
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let store = PointStore::new(Vec::new()).expect("valid");
        let clusters = manager(PipelineConfig::default().with_num_clusters(2))
            .build_clusters(&store, depot())
            .await
            .expect("valid");
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(Cluster::is_empty));
    }

    #[tokio::test]
    async fn test_invalid_cluster_count() {
        let store = PointStore::new(vec![point(0, 52.0, 4.0, 0)]).expect("valid");
        let err = manager(PipelineConfig::default().with_num_clusters(2))
            .build_clusters(&store, depot())
            .await
            .unwrap_err();
        assert!(matches!(err, ClusterError::InvalidClusterCount { k: 2, points: 1 }));
        assert!(store.read().await[0].cluster_id().is_none());
    }

    #[test]
    fn test_config_validation_and_serde() {
        assert!(PipelineConfig::default().with_num_clusters(0).validate().is_err());
        assert!(PipelineConfig::default()
            .with_weights(f64::INFINITY, 0.2)
            .validate()
            .is_err());

        let c: PipelineConfig =
            serde_json::from_str(r#"{"num_clusters": 4, "method": {"method": "agglomerative", "linkage": "average"}}"#)
                .expect("valid");
        assert_eq!(c.num_clusters, 4);
        assert_eq!(c.distance_weight, 0.8);
        assert_eq!(c.priority_weight, 0.2);
    }

    #[test]
    fn test_explicit_strategy_overrides_method() {
        let provider = RoutingMatrixProvider::new(GreatCircleService::new(10), fast()).expect("valid");
        let m = ClusterManager::with_strategy(
            provider,
            Box::new(AgglomerativeClustering::default()),
            PipelineConfig::default().with_method(ClusteringMethod::EmbeddingKMeans(
                EmbeddingKMeansConfig::default(),
            )),
        )
        .expect("valid");
        assert_eq!(m.strategy().name(), "agglomerative");
    }
}
