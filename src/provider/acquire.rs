//! Chunked acquisition of a full travel-cost matrix.
//!
//! # Algorithm
//!
//! Points are split into ⌈N/L⌉ contiguous chunks, where L is the provider's
//! per-request point limit. Every chunk×chunk block is requested as its own
//! job (chunks² jobs), polled until terminal, and its records are written
//! into the full matrix at absolute point positions:
//!
//! ```text
//! full[origin_chunk.start + o][dest_chunk.start + d] = block[o][d]
//! ```
//!
//! Blocks are independent, so up to `max_concurrent_requests` of them run at
//! once. The first failure aborts every outstanding block and the whole
//! acquisition; a partially filled matrix is never returned.

use std::ops::Range;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

use super::config::ProviderConfig;
use super::protocol::{records_to_grid, JobId, JobStatus, MatrixRoutingService};
use crate::distance::DistanceMatrix;
use crate::error::{ClusterError, Result};
use crate::models::{Coordinate, Point};

/// Acquires N×N travel-cost matrices from a size-limited asynchronous
/// routing service.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_cluster::models::{Point, Priority};
/// use u_cluster::provider::{BackoffPolicy, GreatCircleService, ProviderConfig, RoutingMatrixProvider};
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let points: Vec<Point> = (0..5)
///     .map(|i| Point::new(i, 52.0, 4.0 + i as f64 * 0.01, Priority::default()))
///     .collect();
/// let config = ProviderConfig::default()
///     .with_max_points_per_request(2)
///     .with_inter_request_delay(Duration::ZERO)
///     .with_backoff(BackoffPolicy::fixed(Duration::from_millis(1)));
/// let provider = RoutingMatrixProvider::new(GreatCircleService::new(2), config).unwrap();
///
/// let matrix = provider.acquire(&points).await.unwrap();
/// assert_eq!(matrix.size(), 5);
/// assert!(matrix.get(0, 4) > matrix.get(0, 1));
/// # });
/// ```
pub struct RoutingMatrixProvider<S> {
    service: Arc<S>,
    config: ProviderConfig,
}

/// One completed chunk×chunk block.
struct Block {
    origins: Range<usize>,
    destinations: Range<usize>,
    values: Vec<f64>,
}

impl Block {
    fn write_into(&self, matrix: &mut DistanceMatrix) {
        let cols = self.destinations.len();
        for (o, row) in self.origins.clone().enumerate() {
            for (d, col) in self.destinations.clone().enumerate() {
                matrix.set(row, col, self.values[o * cols + d]);
            }
        }
    }
}

impl<S: MatrixRoutingService + 'static> RoutingMatrixProvider<S> {
    /// Creates a provider that owns its service.
    pub fn new(service: S, config: ProviderConfig) -> Result<Self> {
        Self::from_shared(Arc::new(service), config)
    }

    /// Creates a provider over a service shared with other callers.
    pub fn from_shared(service: Arc<S>, config: ProviderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { service, config })
    }

    /// Returns the acquisition settings.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Returns the underlying routing service.
    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Builds the full travel-cost matrix for `points`, indexed by position.
    ///
    /// The result is returned as received: it may be asymmetric.
    #[instrument(skip_all, fields(points = points.len()))]
    pub async fn acquire(&self, points: &[Point]) -> Result<DistanceMatrix> {
        let n = points.len();
        if n == 0 {
            return Ok(DistanceMatrix::new(0));
        }

        let coords: Arc<[Coordinate]> = points.iter().map(Point::coordinate).collect();
        let chunks = chunk_ranges(n, self.config.max_points_per_request);
        let mut blocks = chunks
            .iter()
            .flat_map(|o| chunks.iter().map(move |d| (o.clone(), d.clone())))
            .collect::<Vec<_>>()
            .into_iter();
        info!(
            chunks = chunks.len(),
            requests = chunks.len() * chunks.len(),
            "acquiring travel-cost matrix"
        );

        let mut matrix = DistanceMatrix::new(n);
        let mut tasks = JoinSet::new();
        let mut submitted = 0usize;

        loop {
            while tasks.len() < self.config.max_concurrent_requests {
                let Some((origins, destinations)) = blocks.next() else {
                    break;
                };
                if submitted > 0 && !self.config.inter_request_delay.is_zero() {
                    sleep(self.config.inter_request_delay).await;
                }
                submitted += 1;

                let service = Arc::clone(&self.service);
                let coords = Arc::clone(&coords);
                let config = self.config.clone();
                tasks.spawn(async move {
                    request_block(service.as_ref(), &coords, origins, destinations, &config).await
                });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let outcome = joined.map_err(|e| ClusterError::TaskAborted(e.to_string()));
            match outcome.and_then(|block| block) {
                Ok(block) => block.write_into(&mut matrix),
                Err(e) => {
                    warn!(error = %e, outstanding = tasks.len(), "aborting matrix acquisition");
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        debug!(requests = submitted, "travel-cost matrix complete");
        Ok(matrix)
    }
}

/// Contiguous ranges of at most `limit` positions covering `0..n`.
fn chunk_ranges(n: usize, limit: usize) -> Vec<Range<usize>> {
    (0..n)
        .step_by(limit)
        .map(|start| start..(start + limit).min(n))
        .collect()
}

async fn request_block<S: MatrixRoutingService + ?Sized>(
    service: &S,
    coords: &[Coordinate],
    origins: Range<usize>,
    destinations: Range<usize>,
    config: &ProviderConfig,
) -> Result<Block> {
    let job = service
        .submit(&coords[origins.clone()], &coords[destinations.clone()])
        .await?;
    debug!(%job, ?origins, ?destinations, "matrix block submitted");

    match timeout(config.job_deadline, wait_until_done(service, &job, config)).await {
        Ok(done) => done?,
        Err(_) => {
            return Err(ClusterError::Timeout {
                job_id: job.to_string(),
                waited: config.job_deadline,
            })
        }
    }

    let records = service.fetch(&job).await?;
    let values = records_to_grid(&records, origins.len(), destinations.len())?;
    Ok(Block {
        origins,
        destinations,
        values,
    })
}

async fn wait_until_done<S: MatrixRoutingService + ?Sized>(
    service: &S,
    job: &JobId,
    config: &ProviderConfig,
) -> Result<()> {
    let mut delay = config.backoff.initial;
    loop {
        match service.status(job).await? {
            JobStatus::Completed => return Ok(()),
            JobStatus::Failed(payload) => {
                return Err(ClusterError::JobFailed {
                    job_id: job.to_string(),
                    payload,
                })
            }
            JobStatus::Pending => {
                debug!(%job, ?delay, "job pending");
                sleep(delay).await;
                delay = config.backoff.next_delay(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::models::Priority;
    use crate::provider::{BackoffPolicy, CostRecord, GreatCircleService};

    fn points(n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| {
                let lat = 40.0 + (i % 7) as f64 * 0.013;
                let lon = -3.0 + (i / 7) as f64 * 0.021;
                Point::new(i, lat, lon, Priority::default())
            })
            .collect()
    }

    fn fast_config(limit: usize) -> ProviderConfig {
        ProviderConfig::default()
            .with_max_points_per_request(limit)
            .with_inter_request_delay(Duration::ZERO)
            .with_backoff(BackoffPolicy::fixed(Duration::from_millis(1)))
            .with_job_deadline(Duration::from_secs(5))
    }

    /// Wraps a service and tampers with one job.
    struct Faulty {
        inner: GreatCircleService,
        target_job: usize,
        fault: Fault,
        statuses: AtomicUsize,
    }

    #[derive(Clone, Copy)]
    enum Fault {
        FailJob,
        RejectSubmit,
        DropRecord,
        NeverFinish,
    }

    impl Faulty {
        fn new(fault: Fault, target_job: usize) -> Self {
            Self {
                inner: GreatCircleService::new(100),
                target_job,
                fault,
                statuses: AtomicUsize::new(0),
            }
        }

        fn is_target(&self, job: &JobId) -> bool {
            job.as_str() == format!("gc-{}", self.target_job)
        }
    }

    #[async_trait]
    impl MatrixRoutingService for Faulty {
        async fn submit(&self, origins: &[Coordinate], destinations: &[Coordinate]) -> Result<JobId> {
            if matches!(self.fault, Fault::RejectSubmit)
                && self.inner.submissions() == self.target_job
            {
                return Err(ClusterError::Submission {
                    status: 429,
                    body: "rate limited".into(),
                });
            }
            self.inner.submit(origins, destinations).await
        }

        async fn status(&self, job: &JobId) -> Result<JobStatus> {
            self.statuses.fetch_add(1, Ordering::SeqCst);
            if self.is_target(job) {
                match self.fault {
                    Fault::FailJob => return Ok(JobStatus::Failed("no route".into())),
                    Fault::NeverFinish => return Ok(JobStatus::Pending),
                    _ => {}
                }
            }
            self.inner.status(job).await
        }

        async fn fetch(&self, job: &JobId) -> Result<Vec<CostRecord>> {
            let mut records = self.inner.fetch(job).await?;
            if matches!(self.fault, Fault::DropRecord) && self.is_target(job) {
                records.pop();
            }
            Ok(records)
        }
    }

    #[test]
    fn test_chunk_ranges() {
        assert_eq!(chunk_ranges(5, 2), vec![0..2, 2..4, 4..5]);
        assert_eq!(chunk_ranges(4, 4), vec![0..4]);
        assert_eq!(chunk_ranges(3, 10), vec![0..3]);
        assert!(chunk_ranges(0, 3).is_empty());
    }

    #[tokio::test]
    async fn test_single_chunk() {
        let pts = points(6);
        let provider = RoutingMatrixProvider::new(GreatCircleService::new(6), fast_config(6))
            .expect("valid config");
        let m = provider.acquire(&pts).await.expect("acquired");
        assert_eq!(m.size(), 6);
        assert_eq!(provider.service().submissions(), 1);
        for i in 0..6 {
            assert_eq!(m.get(i, i), 0.0);
            for j in 0..6 {
                let expected = pts[i].coordinate().haversine_to(&pts[j].coordinate());
                assert!((m.get(i, j) - expected).abs() < 1e-9);
            }
        }
    }

    #[tokio::test]
    async fn test_chunk_size_invariance() {
        let pts = points(30);
        let whole = RoutingMatrixProvider::new(GreatCircleService::new(30), fast_config(30))
            .expect("valid config")
            .acquire(&pts)
            .await
            .expect("acquired");

        let chunked_provider =
            RoutingMatrixProvider::new(GreatCircleService::new(13), fast_config(13))
                .expect("valid config");
        let chunked = chunked_provider.acquire(&pts).await.expect("acquired");

        // ⌈30/13⌉ = 3 chunks → 9 block requests.
        assert_eq!(chunked_provider.service().submissions(), 9);
        assert_eq!(whole, chunked);
    }

    #[tokio::test]
    async fn test_concurrent_blocks_match_sequential() {
        let pts = points(17);
        let sequential = RoutingMatrixProvider::new(GreatCircleService::new(5), fast_config(5))
            .expect("valid config")
            .acquire(&pts)
            .await
            .expect("acquired");
        let service = GreatCircleService::new(5).with_pending_polls(2);
        let concurrent =
            RoutingMatrixProvider::new(service, fast_config(5).with_max_concurrent_requests(4))
                .expect("valid config")
                .acquire(&pts)
                .await
                .expect("acquired");
        assert_eq!(sequential, concurrent);
    }

    #[tokio::test]
    async fn test_empty_points_make_no_requests() {
        let provider = RoutingMatrixProvider::new(GreatCircleService::new(3), fast_config(3))
            .expect("valid config");
        let m = provider.acquire(&[]).await.expect("empty");
        assert_eq!(m.size(), 0);
        assert_eq!(provider.service().submissions(), 0);
    }

    #[tokio::test]
    async fn test_failed_job_aborts() {
        let provider = RoutingMatrixProvider::new(Faulty::new(Fault::FailJob, 2), fast_config(4))
            .expect("valid config");
        let err = provider.acquire(&points(10)).await.unwrap_err();
        match err {
            ClusterError::JobFailed { job_id, payload } => {
                assert_eq!(job_id, "gc-2");
                assert_eq!(payload, "no route");
            }
            other => panic!("unexpected error {other:?}"),
        }
        // Sequential mode stops submitting after the failure.
        assert_eq!(provider.service().inner.submissions(), 3);
    }

    #[tokio::test]
    async fn test_rejected_submission_aborts() {
        let provider =
            RoutingMatrixProvider::new(Faulty::new(Fault::RejectSubmit, 1), fast_config(4))
                .expect("valid config");
        let err = provider.acquire(&points(8)).await.unwrap_err();
        assert!(matches!(err, ClusterError::Submission { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_concurrent_failure_aborts() {
        let config = fast_config(3).with_max_concurrent_requests(3);
        let provider = RoutingMatrixProvider::new(Faulty::new(Fault::FailJob, 0), config)
            .expect("valid config");
        let err = provider.acquire(&points(9)).await.unwrap_err();
        assert!(matches!(err, ClusterError::JobFailed { .. }));
    }

    #[tokio::test]
    async fn test_incomplete_block_is_integrity_error() {
        let provider = RoutingMatrixProvider::new(Faulty::new(Fault::DropRecord, 0), fast_config(4))
            .expect("valid config");
        let err = provider.acquire(&points(4)).await.unwrap_err();
        assert!(matches!(err, ClusterError::DataIntegrity(_)));
    }

    #[tokio::test]
    async fn test_job_deadline() {
        let config = fast_config(4).with_job_deadline(Duration::from_millis(30));
        let provider = RoutingMatrixProvider::new(Faulty::new(Fault::NeverFinish, 0), config)
            .expect("valid config");
        let err = provider.acquire(&points(3)).await.unwrap_err();
        match err {
            ClusterError::Timeout { job_id, waited } => {
                assert_eq!(job_id, "gc-0");
                assert_eq!(waited, Duration::from_millis(30));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(provider.service().statuses.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inter_request_delay_paces_submissions() {
        // 2 chunks → 4 blocks, with a pause before each block after the first.
        let config = fast_config(2).with_inter_request_delay(Duration::from_secs(1));
        let provider =
            RoutingMatrixProvider::new(GreatCircleService::new(2), config).expect("valid config");

        let start = tokio::time::Instant::now();
        let m = provider.acquire(&points(4)).await.expect("acquired");
        assert_eq!(m.size(), 4);
        assert_eq!(provider.service().submissions(), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_waits_follow_exponential_backoff() {
        // Three pending polls wait 100ms, 200ms, then the 250ms ceiling.
        let backoff = BackoffPolicy::exponential(
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(250),
        );
        let config = fast_config(4).with_backoff(backoff);
        let service = GreatCircleService::new(4).with_pending_polls(3);
        let provider = RoutingMatrixProvider::new(service, config).expect("valid config");

        let start = tokio::time::Instant::now();
        provider.acquire(&points(3)).await.expect("acquired");
        assert_eq!(start.elapsed(), Duration::from_millis(550));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = RoutingMatrixProvider::new(GreatCircleService::new(3), fast_config(0));
        assert!(matches!(result, Err(ClusterError::InvalidConfig(_))));
    }
}
