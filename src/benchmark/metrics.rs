//! Latency statistics
//!
//! Summaries over the recorded samples, overall and per cache mode.

use serde::{Deserialize, Serialize};

use crate::models::{CacheMode, TermSample};

/// Latency percentiles
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Percentiles {
    /// Calculate percentiles from sorted latencies (in milliseconds)
    pub fn from_sorted(latencies: &[f64]) -> Self {
        if latencies.is_empty() {
            return Self::default();
        }

        Self {
            p50: percentile(latencies, 50.0),
            p90: percentile(latencies, 90.0),
            p95: percentile(latencies, 95.0),
            p99: percentile(latencies, 99.0),
        }
    }
}

/// Linear interpolation between the closest ranks
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let idx = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    let fraction = idx - lower as f64;

    if upper >= sorted.len() {
        sorted[sorted.len() - 1]
    } else {
        sorted[lower] * (1.0 - fraction) + sorted[upper] * fraction
    }
}

/// Latency statistics in milliseconds
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub percentiles: Percentiles,
    pub count: usize,
}

impl LatencyStats {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let sum: f64 = sorted.iter().sum();
        let mean = sum / sorted.len() as f64;

        let variance: f64 =
            sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / sorted.len() as f64;

        Self {
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
            percentiles: Percentiles::from_sorted(&sorted),
            count: sorted.len(),
        }
    }

    /// Format as summary string
    pub fn format_summary(&self) -> String {
        format!(
            "min={:.0}ms max={:.0}ms mean={:.1}ms std={:.1}ms p50={:.1}ms p95={:.1}ms",
            self.min, self.max, self.mean, self.std_dev, self.percentiles.p50, self.percentiles.p95
        )
    }
}

/// Statistics for all samples taken under one cache mode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheModeStats {
    pub cache: CacheMode,
    pub latency: LatencyStats,
    pub failures: usize,
}

impl CacheModeStats {
    /// Group the history by cache mode; modes with no samples are omitted
    pub fn from_history(history: &[TermSample]) -> Vec<CacheModeStats> {
        [CacheMode::Enabled, CacheMode::Disabled]
            .into_iter()
            .filter_map(|cache| {
                let samples: Vec<_> = history.iter().filter(|s| s.cache == cache).collect();
                if samples.is_empty() {
                    return None;
                }

                let measured: Vec<f64> = samples
                    .iter()
                    .filter_map(|s| s.sample.measured())
                    .map(|m| m.duration_ms as f64)
                    .collect();

                Some(CacheModeStats {
                    cache,
                    latency: LatencyStats::from_samples(&measured),
                    failures: samples.len() - measured.len(),
                })
            })
            .collect()
    }
}
