//! Travel-cost matrices.
//!
//! Provides the dense matrix assembled from routing provider responses.

mod matrix;

pub use matrix::DistanceMatrix;
