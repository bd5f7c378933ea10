//! Asynchronous matrix-routing job protocol.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};
use crate::models::Coordinate;

/// Opaque identifier of a submitted matrix job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Wraps an identifier returned by a provider.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The provider's job identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Completed,
    /// Terminal failure carrying the provider's payload.
    Failed(String),
}

/// One origin→destination cost reported by the provider.
///
/// Indices are relative to the origin and destination lists of the
/// submission that produced the job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostRecord {
    pub origin_index: usize,
    pub destination_index: usize,
    pub cost: f64,
}

impl CostRecord {
    /// Creates a record for one origin and destination pair.
    pub fn new(origin_index: usize, destination_index: usize, cost: f64) -> Self {
        Self {
            origin_index,
            destination_index,
            cost,
        }
    }
}

/// An external service computing origin×destination travel costs as
/// asynchronous jobs.
///
/// Implementations only speak the protocol; chunking, polling cadence, and
/// stitching live in [`RoutingMatrixProvider`](super::RoutingMatrixProvider).
#[async_trait]
pub trait MatrixRoutingService: Send + Sync {
    /// Submits a matrix request and returns its job id.
    ///
    /// A rejected submission is a [`ClusterError::Submission`].
    async fn submit(&self, origins: &[Coordinate], destinations: &[Coordinate]) -> Result<JobId>;

    /// Queries the current state of a job.
    async fn status(&self, job: &JobId) -> Result<JobStatus>;

    /// Downloads the cost records of a completed job.
    async fn fetch(&self, job: &JobId) -> Result<Vec<CostRecord>>;
}

/// Converts provider records into a dense row-major `rows × cols` grid.
///
/// Every cell must be reported exactly once with a finite, non-negative
/// cost. Missing, duplicate, or out-of-range pairs are rejected rather than
/// defaulted.
pub fn records_to_grid(records: &[CostRecord], rows: usize, cols: usize) -> Result<Vec<f64>> {
    let mut grid = vec![0.0; rows * cols];
    let mut filled = vec![false; rows * cols];

    for r in records {
        if r.origin_index >= rows || r.destination_index >= cols {
            return Err(ClusterError::DataIntegrity(format!(
                "record ({}, {}) lies outside the {rows}x{cols} grid",
                r.origin_index, r.destination_index
            )));
        }
        if !r.cost.is_finite() || r.cost < 0.0 {
            return Err(ClusterError::DataIntegrity(format!(
                "record ({}, {}) has invalid cost {}",
                r.origin_index, r.destination_index, r.cost
            )));
        }
        let cell = r.origin_index * cols + r.destination_index;
        if filled[cell] {
            return Err(ClusterError::DataIntegrity(format!(
                "record ({}, {}) reported twice",
                r.origin_index, r.destination_index
            )));
        }
        filled[cell] = true;
        grid[cell] = r.cost;
    }

    if let Some(cell) = filled.iter().position(|&f| !f) {
        return Err(ClusterError::DataIntegrity(format!(
            "missing cost for origin {} destination {} ({} of {} records received)",
            cell / cols,
            cell % cols,
            records.len(),
            rows * cols
        )));
    }
    Ok(grid)
}
