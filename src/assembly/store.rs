//! Shared point collection with exclusive access per clustering run.

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{ClusterError, Result};
use crate::models::Point;

/// The caller's point collection, guarded so clustering runs never
/// interleave.
///
/// A run takes the write guard for its whole duration; readers wait until
/// the run has written its cluster ids.
#[derive(Debug)]
pub struct PointStore {
    points: RwLock<Vec<Point>>,
}

impl PointStore {
    /// Wraps `points`, which must be indexed by position.
    ///
    /// # Errors
    ///
    /// [`ClusterError::MisindexedPoint`] if `points[i].index() != i`.
    pub fn new(points: Vec<Point>) -> Result<Self> {
        if let Some((position, p)) = points.iter().enumerate().find(|(i, p)| p.index() != *i) {
            return Err(ClusterError::MisindexedPoint {
                position,
                index: p.index(),
            });
        }
        Ok(Self {
            points: RwLock::new(points),
        })
    }

    /// Shared access for inspection between runs.
    pub async fn read(&self) -> RwLockReadGuard<'_, Vec<Point>> {
        self.points.read().await
    }

    /// Exclusive access for one clustering run.
    pub async fn write(&self) -> RwLockWriteGuard<'_, Vec<Point>> {
        self.points.write().await
    }

    /// Releases the points back to the caller.
    pub fn into_inner(self) -> Vec<Point> {
        self.points.into_inner()
    }
}
