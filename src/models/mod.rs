//! Domain model types for delivery point clustering.
//!
//! Provides delivery points with priorities and time windows, the shared
//! depot, and the depot-anchored clusters produced by a clustering run.

mod cluster;
mod point;

pub use cluster::{Cluster, PriorityCounts, Stop, StopWindow, Waypoint};
pub use point::{Coordinate, Depot, Point, Priority, TimeWindow};
