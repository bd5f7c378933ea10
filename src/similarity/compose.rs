//! Weighted composition of travel cost and priority diversity.

use crate::distance::DistanceMatrix;
use crate::error::{ClusterError, Result};
use crate::models::Priority;

/// Pairwise affinity matrix consumed by clustering strategies.
///
/// Higher values mean two points belong together more strongly. Built per
/// run by [`compose`] and discarded afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    data: Vec<f64>,
    size: usize,
}

impl SimilarityMatrix {
    /// Creates a similarity matrix from an explicit n×n grid.
    ///
    /// Returns `None` if the data length doesn't match `size * size`.
    pub fn from_data(size: usize, data: Vec<f64>) -> Option<Self> {
        if data.len() != size * size {
            return None;
        }
        Some(Self { data, size })
    }

    fn filled(size: usize, value: f64) -> Self {
        Self {
            data: vec![value; size * size],
            size,
        }
    }

    /// Affinity between positions `i` and `j`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.size + j]
    }

    /// Number of points covered.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Row-major entries.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Converts affinities into dissimilarities `max(S) − S_ij`.
    ///
    /// The result is symmetric with a zero diagonal, ready for distance-based
    /// algorithms. Ordering between pairs is preserved in reverse: the most
    /// similar pair becomes the closest.
    pub fn to_dissimilarity(&self) -> DistanceMatrix {
        let n = self.size;
        let max = self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut out = DistanceMatrix::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let s = (self.get(i, j) + self.get(j, i)) / 2.0;
                let d = (max - s).max(0.0);
                out.set(i, j, d);
                out.set(j, i, d);
            }
        }
        out
    }
}

/// Priority closeness for every ordered pair.
///
/// `1 − |p_i − p_j| / max_diff`, where `max_diff` is the largest difference
/// present. When every priority is equal the matrix is all ones.
///
/// # Examples
///
/// ```
/// use u_cluster::models::Priority;
/// use u_cluster::similarity::priority_diversity;
///
/// let p = [0, 3, 3].map(|v| Priority::new(v).unwrap());
/// let div = priority_diversity(&p);
/// assert_eq!(div.get(1, 2), 1.0);
/// assert_eq!(div.get(0, 1), 0.0);
/// ```
pub fn priority_diversity(priorities: &[Priority]) -> SimilarityMatrix {
    let n = priorities.len();
    let (lo, hi) = priorities
        .iter()
        .map(|p| p.value())
        .fold((u8::MAX, u8::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if n == 0 || hi == lo {
        return SimilarityMatrix::filled(n, 1.0);
    }

    let max_diff = f64::from(hi - lo);
    let mut data = Vec::with_capacity(n * n);
    for a in priorities {
        for b in priorities {
            let diff = f64::from(a.value().abs_diff(b.value()));
            data.push(1.0 - diff / max_diff);
        }
    }
    SimilarityMatrix { data, size: n }
}

/// Builds the clustering affinity for one run.
///
/// `distance_weight × normalize(sym(distances)) + priority_weight × diversity(priorities)`.
/// The weights are applied as given and are not rescaled to sum to one, so
/// the composite may exceed `1.0`.
///
/// The result is read as an affinity, and the distance term adds to it: a
/// pair that is farther apart scores *higher*. With a dominant
/// `distance_weight` and equal priorities, strategies therefore group
/// distant points together. Raise `priority_weight` relative to
/// `distance_weight` to let shared priority outweigh travel cost.
///
/// # Errors
///
/// - [`ClusterError::DimensionMismatch`] if `priorities` and `distances`
///   disagree in size
/// - [`ClusterError::InvalidConfig`] if a weight is not finite
///
/// # Examples
///
/// ```
/// use u_cluster::distance::DistanceMatrix;
/// use u_cluster::models::Priority;
/// use u_cluster::similarity::compose;
///
/// let dm = DistanceMatrix::from_data(2, vec![0.0, 100.0, 300.0, 0.0]).unwrap();
/// let p = [Priority::new(1).unwrap(); 2];
/// let s = compose(&dm, &p, 0.8, 0.2).unwrap();
/// // Symmetrized cost 200 is the maximum, so it normalizes to 1.
/// assert!((s.get(0, 1) - 1.0).abs() < 1e-12);
/// assert!((s.get(0, 0) - 0.2).abs() < 1e-12);
/// ```
pub fn compose(
    distances: &DistanceMatrix,
    priorities: &[Priority],
    distance_weight: f64,
    priority_weight: f64,
) -> Result<SimilarityMatrix> {
    if priorities.len() != distances.size() {
        return Err(ClusterError::DimensionMismatch {
            expected: distances.size(),
            actual: priorities.len(),
        });
    }
    if !distance_weight.is_finite() || !priority_weight.is_finite() {
        return Err(ClusterError::InvalidConfig(format!(
            "similarity weights must be finite, got {distance_weight} and {priority_weight}"
        )));
    }

    let normalized = distances.symmetrized().normalized();
    let diversity = priority_diversity(priorities);
    let data = normalized
        .as_slice()
        .iter()
        .zip(diversity.as_slice())
        .map(|(&d, &p)| distance_weight * d + priority_weight * p)
        .collect();
    Ok(SimilarityMatrix {
        data,
        size: distances.size(),
    })
}
