//! Clustering strategies over a precomputed affinity matrix.
//!
//! - [`AgglomerativeClustering`] — Bottom-up merging with complete linkage by default, O(n³)
//! - [`EmbeddingKMeans`] — SMACOF embedding (de Leeuw, 1977) followed by k-means++ (Arthur & Vassilvitskii, 2007)
//!
//! Both implement [`ClusteringStrategy`]; [`ClusteringMethod`] selects one
//! from configuration.

mod agglomerative;
mod embedding;
mod kmeans;
mod smacof;
mod strategy;

pub use agglomerative::{AgglomerativeClustering, AgglomerativeConfig, Linkage};
pub use embedding::{EmbeddingKMeans, EmbeddingKMeansConfig};
pub use kmeans::{KMeans, KMeansResult};
pub use smacof::{Embedding, Smacof};
pub use strategy::{ClusteringMethod, ClusteringStrategy, Partition};
