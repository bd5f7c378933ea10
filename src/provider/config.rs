//! Matrix acquisition configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// Wait schedule between consecutive status polls of one job.
///
/// The first wait is `initial`; each following wait is multiplied by
/// `multiplier` and capped at `max`. A multiplier of `1.0` polls at a fixed
/// interval.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_cluster::provider::BackoffPolicy;
///
/// let policy = BackoffPolicy::exponential(Duration::from_millis(100), 2.0, Duration::from_millis(300));
/// let second = policy.next_delay(policy.initial);
/// assert_eq!(second, Duration::from_millis(200));
/// assert_eq!(policy.next_delay(second), Duration::from_millis(300));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub max: Duration,
}

impl BackoffPolicy {
    /// Polls at a constant interval.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial: interval,
            multiplier: 1.0,
            max: interval,
        }
    }

    /// Polls with geometrically growing waits.
    pub fn exponential(initial: Duration, multiplier: f64, max: Duration) -> Self {
        Self {
            initial,
            multiplier,
            max,
        }
    }

    /// Wait that follows `current`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let nanos = (current.as_nanos() as f64 * self.multiplier).round();
        if nanos >= self.max.as_nanos() as f64 {
            return self.max;
        }
        Duration::from_nanos(nanos as u64)
    }

    fn validate(&self) -> Result<()> {
        if self.initial.is_zero() {
            return Err(ClusterError::InvalidConfig(
                "backoff initial interval must be positive".into(),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ClusterError::InvalidConfig(format!(
                "backoff multiplier must be a finite value >= 1, got {}",
                self.multiplier
            )));
        }
        if self.max < self.initial {
            return Err(ClusterError::InvalidConfig(
                "backoff ceiling is below the initial interval".into(),
            ));
        }
        Ok(())
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(2))
    }
}

/// Limits and pacing for matrix acquisition.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_cluster::provider::ProviderConfig;
///
/// let config = ProviderConfig::default()
///     .with_max_points_per_request(50)
///     .with_max_concurrent_requests(4)
///     .with_job_deadline(Duration::from_secs(120));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Largest origin or destination list accepted per request.
    pub max_points_per_request: usize,
    /// Pause between consecutive job submissions.
    pub inter_request_delay: Duration,
    /// Chunk requests allowed in flight at once.
    pub max_concurrent_requests: usize,
    pub backoff: BackoffPolicy,
    /// Longest time a single job may stay non-terminal.
    pub job_deadline: Duration,
}

impl ProviderConfig {
    /// Sets the provider's per-request point limit.
    pub fn with_max_points_per_request(mut self, limit: usize) -> Self {
        self.max_points_per_request = limit;
        self
    }

    /// Sets the pause between job submissions.
    pub fn with_inter_request_delay(mut self, delay: Duration) -> Self {
        self.inter_request_delay = delay;
        self
    }

    /// Sets how many chunk requests may be in flight.
    pub fn with_max_concurrent_requests(mut self, limit: usize) -> Self {
        self.max_concurrent_requests = limit;
        self
    }

    /// Sets the wait policy between status polls.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets how long one job may stay non-terminal.
    pub fn with_job_deadline(mut self, deadline: Duration) -> Self {
        self.job_deadline = deadline;
        self
    }

    /// Checks limits and pacing values.
    pub fn validate(&self) -> Result<()> {
        if self.max_points_per_request == 0 {
            return Err(ClusterError::InvalidConfig(
                "max_points_per_request must be positive".into(),
            ));
        }
        if self.max_concurrent_requests == 0 {
            return Err(ClusterError::InvalidConfig(
                "max_concurrent_requests must be positive".into(),
            ));
        }
        if self.job_deadline.is_zero() {
            return Err(ClusterError::InvalidConfig(
                "job_deadline must be positive".into(),
            ));
        }
        self.backoff.validate()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            max_points_per_request: 100,
            inter_request_delay: Duration::from_millis(500),
            max_concurrent_requests: 1,
            backoff: BackoffPolicy::default(),
            job_deadline: Duration::from_secs(600),
        }
    }
}
