//! Timing interceptors
//!
//! An interceptor is handed to `HttpClient` at construction and is notified
//! once for every call the client completes, successful or not.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::models::LatencyMeasurement;

/// Details of a finished call
#[derive(Clone, Debug)]
pub struct CompletedCall<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub elapsed: Duration,
    /// `None` when the call failed before a status line arrived
    pub status: Option<u16>,
}

/// Hook invoked after each call completes
pub trait TimingInterceptor: Send + Sync {
    fn on_response(&self, call: &CompletedCall<'_>);
}

const NO_MEASUREMENT: u64 = u64::MAX;

/// Keeps only the most recent measurement.
///
/// Every completed call overwrites the previous value, so `current` must be
/// read before the next call is issued on the same client.
#[derive(Debug)]
pub struct LatestTiming {
    current_ms: AtomicU64,
}

impl LatestTiming {
    pub fn new() -> Self {
        Self {
            current_ms: AtomicU64::new(NO_MEASUREMENT),
        }
    }

    /// Measurement of the last completed call, if any call has completed
    pub fn current(&self) -> Option<LatencyMeasurement> {
        match self.current_ms.load(Ordering::SeqCst) {
            NO_MEASUREMENT => None,
            ms => Some(LatencyMeasurement::from_millis(ms)),
        }
    }
}

impl Default for LatestTiming {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingInterceptor for LatestTiming {
    fn on_response(&self, call: &CompletedCall<'_>) {
        let ms = LatencyMeasurement::from(call.elapsed).duration_ms;
        self.current_ms
            .store(ms.min(NO_MEASUREMENT - 1), Ordering::SeqCst);
    }
}

/// Logs every completed call at debug level
#[derive(Debug, Default)]
pub struct TracingInterceptor;

impl TimingInterceptor for TracingInterceptor {
    fn on_response(&self, call: &CompletedCall<'_>) {
        match call.status {
            Some(status) => debug!(
                "{} {} -> {} in {}ms",
                call.method,
                call.url,
                status,
                call.elapsed.as_millis()
            ),
            None => debug!(
                "{} {} failed after {}ms",
                call.method,
                call.url,
                call.elapsed.as_millis()
            ),
        }
    }
}

/// Fans a single notification out to several interceptors, in order
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn TimingInterceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, interceptor: Arc<dyn TimingInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }
}

impl TimingInterceptor for InterceptorChain {
    fn on_response(&self, call: &CompletedCall<'_>) {
        for interceptor in &self.interceptors {
            interceptor.on_response(call);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(ms: u64, status: Option<u16>) -> CompletedCall<'static> {
        CompletedCall {
            method: "GET",
            url: "http://localhost/Patient",
            elapsed: Duration::from_millis(ms),
            status,
        }
    }

    #[test]
    fn test_latest_timing_starts_empty() {
        let timing = LatestTiming::new();
        assert_eq!(timing.current(), None);
    }

    #[test]
    fn test_latest_timing_overwrites() {
        let timing = LatestTiming::new();
        timing.on_response(&call(120, Some(200)));
        timing.on_response(&call(35, None));
        assert_eq!(timing.current(), Some(LatencyMeasurement::from_millis(35)));
    }

    #[test]
    fn test_chain_notifies_all() {
        let first = Arc::new(LatestTiming::new());
        let second = Arc::new(LatestTiming::new());
        let chain = InterceptorChain::new()
            .with(first.clone())
            .with(Arc::new(TracingInterceptor))
            .with(second.clone());

        chain.on_response(&call(42, Some(200)));

        assert_eq!(first.current(), Some(LatencyMeasurement::from_millis(42)));
        assert_eq!(second.current(), Some(LatencyMeasurement::from_millis(42)));
    }
}
