//! Metric multidimensional scaling by stress majorization (SMACOF).
//!
//! # Algorithm
//!
//! Starting from random coordinates `X`, repeatedly apply the Guttman
//! transform with unit weights:
//!
//! ```text
//! B_ij = −δ_ij / d_ij(X)   (i ≠ j, d_ij > 0; 0 otherwise)
//! B_ii = −Σ_{j≠i} B_ij
//! X'   = B(X) · X / n
//! ```
//!
//! which never increases raw stress `Σ_{i<j} (d_ij(X) − δ_ij)²`. Iteration
//! stops when the relative stress decrease falls below the tolerance or the
//! iteration cap is reached. Several random starts are run and the lowest
//! stress embedding is kept.
//!
//! # Reference
//!
//! de Leeuw, J. (1977). "Applications of convex analysis to multidimensional
//! scaling", *Recent Developments in Statistics*, 133-146.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::distance::DistanceMatrix;

/// Points embedded in a low-dimensional Euclidean space.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// Row-major `n × dimensions` coordinates.
    pub coords: Vec<f64>,
    pub dimensions: usize,
    /// Raw stress of the embedding.
    pub stress: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl Embedding {
    /// Coordinates of point `i`.
    pub fn point(&self, i: usize) -> &[f64] {
        &self.coords[i * self.dimensions..(i + 1) * self.dimensions]
    }

    pub fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.coords.len() / self.dimensions
        }
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

/// SMACOF solver settings.
#[derive(Debug, Clone)]
pub struct Smacof {
    pub dimensions: usize,
    pub max_iterations: usize,
    /// Relative stress decrease below which iteration stops.
    pub tolerance: f64,
    pub restarts: usize,
    pub seed: u64,
}

impl Default for Smacof {
    fn default() -> Self {
        Self {
            dimensions: 2,
            max_iterations: 300,
            tolerance: 1e-3,
            restarts: 4,
            seed: 42,
        }
    }
}

impl Smacof {
    /// Embeds the points described by the dissimilarity matrix `delta`.
    ///
    /// `delta` must be symmetric with a zero diagonal.
    pub fn embed(&self, delta: &DistanceMatrix) -> Embedding {
        let n = delta.size();
        let p = self.dimensions;
        if n <= 1 {
            return Embedding {
                coords: vec![0.0; n * p],
                dimensions: p,
                stress: 0.0,
                iterations: 0,
                converged: true,
            };
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut random_start = || -> Vec<f64> { (0..n * p).map(|_| rng.random::<f64>()).collect() };

        let mut best = self.run_single(delta, random_start());
        for _ in 1..self.restarts {
            let candidate = self.run_single(delta, random_start());
            if candidate.stress < best.stress {
                best = candidate;
            }
        }
        best
    }

    fn run_single(&self, delta: &DistanceMatrix, mut x: Vec<f64>) -> Embedding {
        let n = delta.size();
        let p = self.dimensions;
        let mut dist = pairwise(&x, n, p);
        let mut stress = raw_stress(&dist, delta);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;
            x = guttman_transform(&x, &dist, delta, n, p);
            dist = pairwise(&x, n, p);
            let next = raw_stress(&dist, delta);
            let improvement = stress - next;
            stress = next;
            if stress <= f64::EPSILON || improvement <= self.tolerance * (stress + improvement) {
                converged = true;
                break;
            }
        }

        Embedding {
            coords: x,
            dimensions: p,
            stress,
            iterations,
            converged,
        }
    }
}

fn pairwise(x: &[f64], n: usize, p: usize) -> Vec<f64> {
    let mut d = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let sq: f64 = (0..p).map(|c| (x[i * p + c] - x[j * p + c]).powi(2)).sum();
            let v = sq.sqrt();
            d[i * n + j] = v;
            d[j * n + i] = v;
        }
    }
    d
}

fn raw_stress(dist: &[f64], delta: &DistanceMatrix) -> f64 {
    let n = delta.size();
    let mut s = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            s += (dist[i * n + j] - delta.get(i, j)).powi(2);
        }
    }
    s
}

fn guttman_transform(x: &[f64], dist: &[f64], delta: &DistanceMatrix, n: usize, p: usize) -> Vec<f64> {
    let mut out = vec![0.0; n * p];
    for i in 0..n {
        let mut diag = 0.0;
        for j in (0..n).filter(|&j| j != i) {
            let d = dist[i * n + j];
            let ratio = if d > 0.0 { delta.get(i, j) / d } else { 0.0 };
            diag += ratio;
            for c in 0..p {
                out[i * p + c] -= ratio * x[j * p + c];
            }
        }
        for c in 0..p {
            out[i * p + c] += diag * x[i * p + c];
        }
    }
    for v in &mut out {
        *v /= n as f64;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn euclidean(points: &[(f64, f64)]) -> DistanceMatrix {
        let n = points.len();
        let mut dm = DistanceMatrix::new(n);
        for i in 0..n {
            for j in 0..n {
                let (dx, dy) = (points[i].0 - points[j].0, points[i].1 - points[j].1);
                dm.set(i, j, (dx * dx + dy * dy).sqrt());
            }
        }
        dm
    }

    fn embedded_distance(e: &Embedding, i: usize, j: usize) -> f64 {
        e.point(i)
            .iter()
            .zip(e.point(j))
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    #[test]
    fn test_recovers_planar_configuration() {
        let points = [(0.0, 0.0), (3.0, 0.0), (0.0, 4.0), (3.0, 4.0), (1.5, 2.0)];
        let delta = euclidean(&points);
        let smacof = Smacof {
            max_iterations: 1000,
            tolerance: 1e-9,
            ..Smacof::default()
        };
        let e = smacof.embed(&delta);
        assert_eq!(e.len(), 5);
        assert!(e.stress < 1e-2, "stress {}", e.stress);
        assert!((embedded_distance(&e, 0, 3) - 5.0).abs() < 0.1);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let delta = euclidean(&[(0.0, 0.0), (1.0, 0.0), (5.0, 5.0), (6.0, 5.0)]);
        let a = Smacof::default().embed(&delta);
        let b = Smacof::default().embed(&delta);
        assert_eq!(a, b);
    }

    #[test]
    fn test_degenerate_inputs() {
        let e = Smacof::default().embed(&DistanceMatrix::new(0));
        assert!(e.is_empty());
        let e = Smacof::default().embed(&DistanceMatrix::new(1));
        assert_eq!(e.coords, vec![0.0, 0.0]);

        // All-zero dissimilarities collapse to a single location.
        let e = Smacof::default().embed(&DistanceMatrix::new(3));
        assert!(e.converged);
        assert!(embedded_distance(&e, 0, 2) < 1e-9);
    }

    #[test]
    fn test_stress_never_increases() {
        let delta = euclidean(&[(0.0, 0.0), (2.0, 1.0), (4.0, 0.0), (1.0, 3.0)]);
        let smacof = Smacof::default();
        let init = vec![0.1, 0.9, 0.4, 0.3, 0.8, 0.2, 0.5, 0.6];
        let mut x = init;
        let mut dist = pairwise(&x, 4, 2);
        let mut prev = raw_stress(&dist, &delta);
        for _ in 0..20 {
            x = guttman_transform(&x, &dist, &delta, 4, smacof.dimensions);
            dist = pairwise(&x, 4, 2);
            let s = raw_stress(&dist, &delta);
            assert!(s <= prev + 1e-9);
            prev = s;
        }
    }
}
