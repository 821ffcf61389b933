//! Run summary
//!
//! Snapshot of a finished run, ready to be rendered by `output`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::controller::{ControllerConfig, RunError};
use super::metrics::CacheModeStats;
use super::store::AggregationStore;
use crate::models::{CacheMode, LatencySample, QueryTerm, TermSample};

/// Average latency of one iteration
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IterationAverage {
    pub iteration: u32,
    pub cache: CacheMode,
    pub average: LatencySample,
}

/// Last recorded latency of one term
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TermLatency {
    pub term: QueryTerm,
    pub latency: LatencySample,
}

/// How a run ended
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// A search failed under the abort policy
    Aborted {
        iteration: u32,
        term: QueryTerm,
        kind: String,
        error: String,
    },
    Cancelled { iteration: u32 },
    DeadlineExceeded { deadline_ms: u64 },
    Rejected { reason: String },
}

impl RunStatus {
    pub fn from_result<T>(result: &Result<T, RunError>) -> Self {
        match result {
            Ok(_) => RunStatus::Completed,
            Err(RunError::Search {
                iteration,
                term,
                source,
                ..
            }) => RunStatus::Aborted {
                iteration: *iteration,
                term: term.clone(),
                kind: source.kind().to_string(),
                error: source.to_string(),
            },
            Err(RunError::Cancelled(iteration)) => RunStatus::Cancelled {
                iteration: *iteration,
            },
            Err(RunError::DeadlineExceeded(deadline)) => RunStatus::DeadlineExceeded {
                deadline_ms: deadline.as_millis() as u64,
            },
            Err(RunError::Input(reason)) => RunStatus::Rejected {
                reason: reason.clone(),
            },
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Aborted {
                iteration,
                term,
                kind,
                ..
            } => write!(
                f,
                "incomplete: aborted in iteration {iteration} at term '{term}' ({kind})"
            ),
            RunStatus::Cancelled { iteration } => {
                write!(f, "incomplete: cancelled in iteration {iteration}")
            }
            RunStatus::DeadlineExceeded { deadline_ms } => {
                write!(f, "incomplete: deadline of {deadline_ms}ms exceeded")
            }
            RunStatus::Rejected { reason } => write!(f, "incomplete: rejected: {reason}"),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub requested_iterations: u32,
    /// Iterations whose average was recorded
    pub completed_iterations: u32,
    pub display: bool,
    pub iterations: Vec<IterationAverage>,
    /// Sorted by term
    pub term_latencies: Vec<TermLatency>,
    pub history: Vec<TermSample>,
    pub cache_stats: Vec<CacheModeStats>,
    pub rendered_names: Vec<String>,
}

impl RunSummary {
    pub fn new(
        base_url: impl Into<String>,
        config: &ControllerConfig,
        store: &AggregationStore,
        started_at: DateTime<Utc>,
        requested_iterations: u32,
        status: RunStatus,
    ) -> Self {
        let iterations: Vec<IterationAverage> = store
            .iteration_latencies()
            .iter()
            .map(|(&iteration, &average)| IterationAverage {
                iteration,
                cache: config.cache_rule.cache_mode(iteration),
                average,
            })
            .collect();

        let mut term_latencies: Vec<TermLatency> = store
            .term_latencies()
            .iter()
            .map(|(term, &latency)| TermLatency {
                term: term.clone(),
                latency,
            })
            .collect();
        term_latencies.sort_by(|a, b| a.term.cmp(&b.term));

        Self {
            base_url: base_url.into(),
            started_at,
            finished_at: Utc::now(),
            status,
            requested_iterations,
            completed_iterations: iterations.len() as u32,
            display: config.display,
            iterations,
            term_latencies,
            history: store.history().to_vec(),
            cache_stats: CacheModeStats::from_history(store.history()),
            rendered_names: store.rendered_names().to_vec(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_completed()
    }

    /// Samples of the final iteration, in call order
    pub fn last_iteration_samples(&self) -> impl Iterator<Item = &TermSample> {
        let last = self.iterations.last().map(|i| i.iteration);
        self.history
            .iter()
            .filter(move |s| Some(s.iteration) == last)
    }
}
