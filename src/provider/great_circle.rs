//! In-process matrix service backed by great-circle distances.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::protocol::{CostRecord, JobId, JobStatus, MatrixRoutingService};
use crate::error::{ClusterError, Result};
use crate::models::Coordinate;

struct Job {
    records: Vec<CostRecord>,
    polls_left: usize,
}

/// Computes haversine distances (meters) locally while speaking the
/// asynchronous job protocol.
///
/// Useful for offline runs and for exercising chunking: submissions larger
/// than the configured point limit are rejected with status 400, the same
/// way a size-limited provider would.
///
/// # Examples
///
/// ```
/// use u_cluster::models::Coordinate;
/// use u_cluster::provider::{GreatCircleService, JobStatus, MatrixRoutingService};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let service = GreatCircleService::new(10);
/// let stops = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0)];
/// let job = service.submit(&stops, &stops).await.unwrap();
/// assert_eq!(service.status(&job).await.unwrap(), JobStatus::Completed);
/// assert_eq!(service.fetch(&job).await.unwrap().len(), 4);
/// # });
/// ```
pub struct GreatCircleService {
    max_points: usize,
    pending_polls: usize,
    next_id: AtomicUsize,
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl GreatCircleService {
    /// Creates a service accepting at most `max_points` origins and
    /// destinations per submission.
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points,
            pending_polls: 0,
            next_id: AtomicUsize::new(0),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Reports each job as pending for the given number of status polls.
    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Number of jobs submitted so far.
    pub fn submissions(&self) -> usize {
        self.next_id.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatrixRoutingService for GreatCircleService {
    async fn submit(&self, origins: &[Coordinate], destinations: &[Coordinate]) -> Result<JobId> {
        if origins.len() > self.max_points || destinations.len() > self.max_points {
            return Err(ClusterError::Submission {
                status: 400,
                body: format!(
                    "{}x{} exceeds the {} point limit",
                    origins.len(),
                    destinations.len(),
                    self.max_points
                ),
            });
        }

        let records = origins
            .iter()
            .enumerate()
            .flat_map(|(o, from)| {
                destinations
                    .iter()
                    .enumerate()
                    .map(move |(d, to)| CostRecord::new(o, d, from.haversine_to(to)))
            })
            .collect();

        let id = JobId::new(format!("gc-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.jobs.lock().await.insert(
            id.clone(),
            Job {
                records,
                polls_left: self.pending_polls,
            },
        );
        Ok(id)
    }

    async fn status(&self, job: &JobId) -> Result<JobStatus> {
        let mut jobs = self.jobs.lock().await;
        let entry = jobs
            .get_mut(job)
            .ok_or_else(|| ClusterError::Protocol(format!("unknown job {job}")))?;
        if entry.polls_left > 0 {
            entry.polls_left -= 1;
            return Ok(JobStatus::Pending);
        }
        Ok(JobStatus::Completed)
    }

    /// Hands out the records of a completed job and forgets the job.
    async fn fetch(&self, job: &JobId) -> Result<Vec<CostRecord>> {
        let mut jobs = self.jobs.lock().await;
        match jobs.get(job).map(|entry| entry.polls_left) {
            Some(0) => Ok(jobs.remove(job).map(|entry| entry.records).unwrap_or_default()),
            Some(_) => Err(ClusterError::Protocol(format!("job {job} is not completed"))),
            None => Err(ClusterError::Protocol(format!("unknown job {job}"))),
        }
    }
}
