//! Cluster assembly.
//!
//! - [`assemble`] — applies a [`Partition`](crate::clustering::Partition) to the points and builds clusters
//! - [`PointStore`] — lock-guarded point collection owned by the caller

mod assemble;
mod store;

pub use assemble::assemble;
pub use store::PointStore;
