//! Similarity composition.
//!
//! Blends normalized travel cost with priority diversity into the affinity
//! matrix that clustering strategies partition.

mod compose;

pub use compose::{compose, priority_diversity, SimilarityMatrix};
