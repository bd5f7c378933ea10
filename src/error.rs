//! Error type shared by every stage of a clustering run.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while acquiring matrices, composing similarity, partitioning,
/// or assembling clusters.
///
/// Every variant is fatal to the run that produced it: no partial matrix or
/// cluster set is returned alongside an error.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The provider rejected a matrix submission.
    #[error("matrix routing submission rejected with status {status}: {body}")]
    Submission { status: u16, body: String },

    /// The provider reported a job as failed.
    #[error("matrix routing job {job_id} failed: {payload}")]
    JobFailed { job_id: String, payload: String },

    /// A job did not reach a terminal state before its deadline.
    #[error("matrix routing job {job_id} did not finish within {waited:?}")]
    Timeout { job_id: String, waited: Duration },

    /// A provider response does not cover the requested origin×destination grid.
    #[error("provider response integrity violation: {0}")]
    DataIntegrity(String),

    /// The provider answered with a payload this client cannot interpret.
    #[error("unexpected provider response: {0}")]
    Protocol(String),

    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A priority outside `0..=3`.
    #[error("priority {0} is outside 0..=3")]
    InvalidPriority(u8),

    /// A point whose stored index does not match its position in the collection.
    #[error("point at position {position} carries index {index}")]
    MisindexedPoint { position: usize, index: usize },

    /// A requested cluster count that cannot partition the points.
    #[error("cannot form {k} clusters from {points} points")]
    InvalidClusterCount { k: usize, points: usize },

    /// Two inputs that must agree in size do not.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A label assignment that does not fit the points or cluster count.
    #[error("invalid label assignment: {0}")]
    InvalidLabels(String),

    /// A config value outside its accepted range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A spawned chunk request panicked or was cancelled unexpectedly.
    #[error("chunk request task aborted: {0}")]
    TaskAborted(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ClusterError>;
