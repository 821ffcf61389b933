//! Iteration controller
//!
//! Runs the term list once per iteration, choosing the cache mode for each
//! iteration from a `CacheRule`, and records every latency in the
//! `AggregationStore`.

use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{info, warn};

use super::store::{AggregationStore, IterationLatencyMap};
use crate::fhir::{RecordSearch, ResultProjector, SearchError};
use crate::models::{CacheMode, CacheRule, FaultPolicy, LatencySample, QueryTerm, RecordPage};
use crate::utils::Stopwatch;

/// Run failures
#[derive(Error, Debug)]
pub enum RunError {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("iteration {iteration}, term '{term}' ({cache}): {source}")]
    Search {
        iteration: u32,
        term: QueryTerm,
        cache: CacheMode,
        source: SearchError,
    },

    #[error("run cancelled during iteration {0}")]
    Cancelled(u32),

    #[error("run did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

/// Controller settings
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    pub cache_rule: CacheRule,
    /// Delay between iterations
    pub pause: Duration,
    pub fault_policy: FaultPolicy,
    /// Project the last page of every iteration and log per-term lines
    pub display: bool,
    /// Searches in flight within one iteration; 1 keeps calls strictly sequential
    pub concurrency: usize,
    /// Upper bound on the whole run
    pub deadline: Option<Duration>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cache_rule: CacheRule::default(),
            pause: Duration::from_secs(5),
            fault_policy: FaultPolicy::Abort,
            display: false,
            concurrency: 1,
            deadline: None,
        }
    }
}

impl ControllerConfig {
    pub fn with_cache_rule(mut self, rule: CacheRule) -> Self {
        self.cache_rule = rule;
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    pub fn with_display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Stops a running controller between calls
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.stopped.store(false, Ordering::SeqCst);
    }

    /// Sleep for `pause`, returning early if stopped
    async fn pause(&self, pause: Duration) {
        let notified = self.notify.notified();
        if self.is_stopped() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = notified => {}
        }
    }
}

/// Drives the benchmark iterations
pub struct IterationController<C> {
    client: C,
    config: ControllerConfig,
    projector: ResultProjector,
    store: AggregationStore,
    stop: StopHandle,
}

impl<C: RecordSearch> IterationController<C> {
    pub fn new(client: C, config: ControllerConfig) -> Self {
        Self {
            client,
            config,
            projector: ResultProjector::default(),
            store: AggregationStore::new(),
            stop: StopHandle::default(),
        }
    }

    pub fn with_projector(mut self, projector: ResultProjector) -> Self {
        self.projector = projector;
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Cache mode used for a 1-based iteration index
    pub fn cache_mode(&self, iteration: u32) -> CacheMode {
        self.config.cache_rule.cache_mode(iteration)
    }

    /// Run `iterations` passes over `terms`.
    ///
    /// The store is cleared first. On error no map is returned; whatever was
    /// recorded before the failure stays readable through `store()`.
    pub async fn run(
        &mut self,
        terms: &[QueryTerm],
        iterations: u32,
    ) -> Result<IterationLatencyMap, RunError> {
        if terms.is_empty() {
            return Err(RunError::Input("term list is empty".to_string()));
        }
        if iterations == 0 {
            return Err(RunError::Input(
                "iteration count must be at least 1".to_string(),
            ));
        }

        self.store.reset();
        self.stop.reset();

        match self.config.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.run_iterations(terms, iterations))
                .await
                .map_err(|_| RunError::DeadlineExceeded(deadline))?,
            None => self.run_iterations(terms, iterations).await,
        }
    }

    async fn run_iterations(
        &mut self,
        terms: &[QueryTerm],
        iterations: u32,
    ) -> Result<IterationLatencyMap, RunError> {
        info!(
            "Running {} iterations over {} terms",
            iterations,
            terms.len()
        );
        let mut stopwatch = Stopwatch::new();

        for iteration in 1..=iterations {
            let cache = self.cache_mode(iteration);
            info!("=== Iteration {}/{} ({}) ===", iteration, iterations, cache);

            let (samples, last_page) = self.run_iteration(iteration, cache, terms).await?;

            let average = LatencySample::average(&samples);
            self.store.record_iteration(iteration, average);
            stopwatch.lap(format!("iteration {iteration}"));

            if self.config.display {
                self.display(last_page.as_ref());
            }

            info!("Iteration {} average: {}", iteration, average);

            if iteration < iterations {
                self.stop.pause(self.config.pause).await;
                stopwatch.lap(format!("pause after iteration {iteration}"));
                if self.stop.is_stopped() {
                    return Err(RunError::Cancelled(iteration));
                }
            }
        }

        for (label, elapsed) in stopwatch.lap_times() {
            info!("{} took {}ms", label, elapsed.as_millis());
        }

        Ok(self.store.iteration_latencies().clone())
    }

    /// One pass over the terms; returns the samples in term order and the
    /// page of the last term when that search succeeded.
    async fn run_iteration(
        &mut self,
        iteration: u32,
        cache: CacheMode,
        terms: &[QueryTerm],
    ) -> Result<(Vec<LatencySample>, Option<RecordPage>), RunError> {
        let client = &self.client;
        let store = &mut self.store;
        let stop = &self.stop;
        let policy = self.config.fault_policy;
        let display = self.config.display;

        let mut results = stream::iter(terms.iter().map(|term| async move {
            (term, client.search(term, cache).await)
        }))
        .buffered(self.config.concurrency.max(1));

        let mut samples = Vec::with_capacity(terms.len());
        let mut last_page = None;

        loop {
            if stop.is_stopped() {
                return Err(RunError::Cancelled(iteration));
            }
            let Some((term, result)) = results.next().await else {
                break;
            };

            let sample = match result {
                Ok(response) => {
                    last_page = Some(response.page);
                    LatencySample::Measured(response.latency)
                }
                Err(source) => match policy {
                    FaultPolicy::Abort => {
                        return Err(RunError::Search {
                            iteration,
                            term: term.clone(),
                            cache,
                            source,
                        });
                    }
                    FaultPolicy::Continue => {
                        warn!(
                            "Iteration {}: {} failure for '{}', continuing: {}",
                            iteration,
                            source.kind(),
                            term,
                            source
                        );
                        last_page = None;
                        LatencySample::Failed
                    }
                },
            };

            if display {
                info!("For name: {}, time taken: {}", term, sample);
            }

            store.record_term(iteration, term, cache, sample);
            samples.push(sample);
        }

        Ok((samples, last_page))
    }

    fn display(&mut self, last_page: Option<&RecordPage>) {
        match last_page {
            Some(page) => {
                if page.is_empty() {
                    info!("Last search of the iteration matched no records");
                }
                let names = self.projector.project(page);
                info!("Projected {} of {} records", names.len(), page.len());
                self.store.set_rendered_names(names);
            }
            None => {
                warn!("Last search of the iteration failed, nothing to display");
                self.store.set_rendered_names(Vec::new());
            }
        }
    }
}
