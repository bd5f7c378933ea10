//! # u-cluster
//!
//! Delivery point clustering for route planning: travel-cost matrices from
//! asynchronous routing providers, priority-aware similarity, pluggable
//! partitioning, and depot-anchored clusters ready for route optimization.
//!
//! ## Modules
//!
//! - [`models`] — Domain model types (Point, Priority, TimeWindow, Depot, Cluster)
//! - [`distance`] — Dense travel-cost matrix
//! - [`provider`] — Chunked, polled acquisition from matrix routing services (TomTom, great-circle)
//! - [`similarity`] — Weighted blend of normalized cost and priority diversity
//! - [`clustering`] — Agglomerative and SMACOF + k-means strategies
//! - [`assembly`] — Label application and the lock-guarded point store
//! - [`pipeline`] — End-to-end clustering run
//! - [`error`] — Crate error type
//!
//! The library emits `tracing` events and never installs a subscriber.

pub mod assembly;
pub mod clustering;
pub mod distance;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod provider;
pub mod similarity;
