//! Latency models
//!
//! One `LatencySample` is produced per search call; iteration averages are
//! derived from the measured samples of that iteration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::{CacheMode, QueryTerm};

/// Round-trip time of exactly one call
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LatencyMeasurement {
    pub duration_ms: u64,
}

impl LatencyMeasurement {
    pub fn from_millis(duration_ms: u64) -> Self {
        Self { duration_ms }
    }
}

impl From<Duration> for LatencyMeasurement {
    fn from(duration: Duration) -> Self {
        Self {
            duration_ms: duration.as_millis() as u64,
        }
    }
}

impl fmt::Display for LatencyMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ms", self.duration_ms)
    }
}

/// A recorded latency, or the sentinel for a call that failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencySample {
    Measured(LatencyMeasurement),
    Failed,
}

impl LatencySample {
    pub fn millis(duration_ms: u64) -> Self {
        LatencySample::Measured(LatencyMeasurement::from_millis(duration_ms))
    }

    pub fn measured(&self) -> Option<LatencyMeasurement> {
        match self {
            LatencySample::Measured(m) => Some(*m),
            LatencySample::Failed => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LatencySample::Failed)
    }

    /// Truncating integer mean of the measured samples.
    ///
    /// Failed samples are left out of both the sum and the count; when nothing
    /// was measured the average itself is `Failed`.
    pub fn average<'a>(samples: impl IntoIterator<Item = &'a LatencySample>) -> LatencySample {
        let (sum, count) = samples
            .into_iter()
            .filter_map(LatencySample::measured)
            .fold((0u64, 0u64), |(sum, count), m| (sum + m.duration_ms, count + 1));

        if count == 0 {
            LatencySample::Failed
        } else {
            LatencySample::millis(sum / count)
        }
    }
}

impl fmt::Display for LatencySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatencySample::Measured(m) => write!(f, "{m}"),
            LatencySample::Failed => write!(f, "failed"),
        }
    }
}

/// One entry of the per-iteration sample history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSample {
    pub iteration: u32,
    pub term: QueryTerm,
    pub cache: CacheMode,
    pub sample: LatencySample,
}
