//! Dense travel-cost matrix.

/// A dense n×n travel-cost matrix stored in row-major order.
///
/// Entries are indexed by point position. Matrices received from a routing
/// provider may be asymmetric; [`symmetrized`](Self::symmetrized) averages a
/// matrix with its transpose.
///
/// # Examples
///
/// ```
/// use u_cluster::distance::DistanceMatrix;
///
/// let dm = DistanceMatrix::from_data(2, vec![0.0, 10.0, 20.0, 0.0]).unwrap();
/// assert!(!dm.is_symmetric(1e-10));
///
/// let sym = dm.symmetrized();
/// assert_eq!(sym.get(0, 1), 15.0);
/// assert_eq!(sym.normalized().max(), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    data: Vec<f64>,
    size: usize,
}

impl DistanceMatrix {
    /// Creates a distance matrix of the given size, initialized to zero.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0.0; size * size],
            size,
        }
    }

    /// Creates a distance matrix from an explicit n×n grid.
    ///
    /// Returns `None` if the data length doesn't match `size * size`.
    pub fn from_data(size: usize, data: Vec<f64>) -> Option<Self> {
        if data.len() != size * size {
            return None;
        }
        Some(Self { data, size })
    }

    /// Returns the cost from position `from` to position `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    /// Sets the cost from position `from` to position `to`.
    pub fn set(&mut self, from: usize, to: usize, cost: f64) {
        self.data[from * self.size + to] = cost;
    }

    /// Number of positions in this matrix.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Row-major entries.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Returns `true` if the matrix is symmetric within the given tolerance.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                if (self.get(i, j) - self.get(j, i)).abs() > tol {
                    return false;
                }
            }
        }
        true
    }

    /// Returns `(M + Mᵀ) / 2`.
    pub fn symmetrized(&self) -> Self {
        let mut out = self.clone();
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                let avg = (self.get(i, j) + self.get(j, i)) / 2.0;
                out.set(i, j, avg);
                out.set(j, i, avg);
            }
        }
        out
    }

    /// Largest entry, or `0.0` for an empty matrix.
    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(0.0, f64::max)
    }

    /// Divides every entry by the global maximum.
    ///
    /// A matrix whose maximum is zero (coincident points, or fewer than two
    /// points) normalizes to all zeros.
    pub fn normalized(&self) -> Self {
        let max = self.max();
        if max <= 0.0 {
            return Self::new(self.size);
        }
        Self {
            data: self.data.iter().map(|&d| d / max).collect(),
            size: self.size,
        }
    }
}
