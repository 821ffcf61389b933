//! HTTP client module
//!
//! Thin reqwest wrapper that times every call and reports it to the
//! registered interceptors.

mod client;
mod interceptor;

pub use client::{HttpClient, HttpError, HttpRequest};
pub use interceptor::{InterceptorChain, LatestTiming, TimingInterceptor, TracingInterceptor};
#[cfg(test)]
pub use interceptor::CompletedCall;
