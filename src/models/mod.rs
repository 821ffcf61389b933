//! Data models for the search benchmark
//!
//! Query terms, cache modes, latency samples and record shapes shared by the
//! client, controller and report layers.

mod latency;
mod query;
mod record;

pub use latency::{LatencyMeasurement, LatencySample, TermSample};
pub use query::{CacheMode, CacheRule, FaultPolicy, QueryTerm};
pub use record::{NormalizedRecord, RecordPage};
