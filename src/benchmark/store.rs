//! Aggregation store
//!
//! Holds everything a run records. Owned by the controller and cleared at the
//! start of every run, so nothing carries over between runs.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::fhir::RenderedNameList;
use crate::models::{CacheMode, LatencySample, QueryTerm, TermSample};

/// Latest sample per term; a later iteration overwrites an earlier one
pub type TermLatencyMap = HashMap<QueryTerm, LatencySample>;

/// Average sample per 1-based iteration, iterated in index order
pub type IterationLatencyMap = BTreeMap<u32, LatencySample>;

#[derive(Clone, Debug, Default, Serialize)]
pub struct AggregationStore {
    term_latencies: TermLatencyMap,
    iteration_latencies: IterationLatencyMap,
    history: Vec<TermSample>,
    rendered_names: RenderedNameList,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything recorded so far
    pub fn reset(&mut self) {
        self.term_latencies.clear();
        self.iteration_latencies.clear();
        self.history.clear();
        self.rendered_names.clear();
    }

    /// Record one call's sample
    pub fn record_term(
        &mut self,
        iteration: u32,
        term: &QueryTerm,
        cache: CacheMode,
        sample: LatencySample,
    ) {
        self.term_latencies.insert(term.clone(), sample);
        self.history.push(TermSample {
            iteration,
            term: term.clone(),
            cache,
            sample,
        });
    }

    pub fn record_iteration(&mut self, iteration: u32, average: LatencySample) {
        self.iteration_latencies.insert(iteration, average);
    }

    /// Replace the rendered list wholesale
    pub fn set_rendered_names(&mut self, names: RenderedNameList) {
        self.rendered_names = names;
    }

    pub fn term_latencies(&self) -> &TermLatencyMap {
        &self.term_latencies
    }

    pub fn iteration_latencies(&self) -> &IterationLatencyMap {
        &self.iteration_latencies
    }

    pub fn history(&self) -> &[TermSample] {
        &self.history
    }

    pub fn rendered_names(&self) -> &[String] {
        &self.rendered_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(s: &str) -> QueryTerm {
        QueryTerm::parse(s).unwrap()
    }

    #[test]
    fn test_later_iteration_overwrites_term() {
        let mut store = AggregationStore::new();
        store.record_term(1, &term("SMITH"), CacheMode::Enabled, LatencySample::millis(200));
        store.record_term(2, &term("SMITH"), CacheMode::Enabled, LatencySample::millis(40));

        assert_eq!(
            store.term_latencies().get(&term("SMITH")),
            Some(&LatencySample::millis(40))
        );
        assert_eq!(store.term_latencies().len(), 1);
        assert_eq!(store.history().len(), 2);
        assert_eq!(store.history()[0].sample, LatencySample::millis(200));
    }

    #[test]
    fn test_rendered_names_replaced() {
        let mut store = AggregationStore::new();
        store.set_rendered_names(vec!["a".to_string(), "b".to_string()]);
        store.set_rendered_names(vec!["c".to_string()]);
        assert_eq!(store.rendered_names(), ["c".to_string()]);
    }

    #[test]
    fn test_reset() {
        let mut store = AggregationStore::new();
        store.record_term(1, &term("JONES"), CacheMode::Disabled, LatencySample::Failed);
        store.record_iteration(1, LatencySample::Failed);
        store.set_rendered_names(vec!["x".to_string()]);

        store.reset();

        assert!(store.term_latencies().is_empty());
        assert!(store.iteration_latencies().is_empty());
        assert!(store.history().is_empty());
        assert!(store.rendered_names().is_empty());
    }

    #[test]
    fn test_iterations_in_index_order() {
        let mut store = AggregationStore::new();
        store.record_iteration(3, LatencySample::millis(30));
        store.record_iteration(1, LatencySample::millis(10));
        store.record_iteration(2, LatencySample::millis(20));

        let keys: Vec<_> = store.iteration_latencies().keys().copied().collect();
        assert_eq!(keys, vec![1, 2, 3]);
    }
}
