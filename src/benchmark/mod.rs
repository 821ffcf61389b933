//! Benchmark execution
//!
//! Iteration control, aggregation of latency samples, and the statistics and
//! summary built from them.

mod controller;
mod metrics;
mod report;
mod store;

pub use controller::{ControllerConfig, IterationController};
pub use report::{RunStatus, RunSummary};
#[cfg(test)]
pub use store::AggregationStore;
