//! Travel-cost matrix acquisition from asynchronous routing services.
//!
//! - [`MatrixRoutingService`] — submit/status/fetch job protocol
//! - [`RoutingMatrixProvider`] — chunking, polling, and stitching into an N×N matrix
//! - [`TomTomMatrixService`] — HTTP client for the TomTom async matrix API
//! - [`GreatCircleService`] — in-process haversine service for offline runs

mod acquire;
mod config;
mod great_circle;
mod protocol;
mod tomtom;

pub use acquire::RoutingMatrixProvider;
pub use config::{BackoffPolicy, ProviderConfig};
pub use great_circle::GreatCircleService;
pub use protocol::{records_to_grid, CostRecord, JobId, JobStatus, MatrixRoutingService};
pub use tomtom::{TomTomConfig, TomTomMatrixService};
