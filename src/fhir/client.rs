//! Patient search client
//!
//! Issues one `GET {base}/Patient?family=<term>` per search and hands the
//! timing to the interceptor registered on the underlying `HttpClient`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::bundle::Bundle;
use crate::http::{HttpClient, HttpError, HttpRequest, TimingInterceptor};
use crate::models::{CacheMode, LatencyMeasurement, QueryTerm, RecordPage};

const FHIR_JSON: &str = "application/fhir+json";
const MAX_ERROR_BODY: usize = 200;

/// Search failures
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search term must not be empty")]
    EmptyTerm,

    #[error("transport error: {0}")]
    Transport(#[from] HttpError),

    #[error("remote error: HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("remote error: malformed response body: {0}")]
    MalformedBody(String),
}

impl SearchError {
    /// Short name of the error kind, for reports
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::EmptyTerm => "input",
            SearchError::Transport(_) => "transport",
            SearchError::Remote { .. } | SearchError::MalformedBody(_) => "remote",
        }
    }
}

/// A page of records together with the latency of the call that fetched it
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResponse {
    pub page: RecordPage,
    pub latency: LatencyMeasurement,
}

/// Anything that can run a family-name search
#[async_trait]
pub trait RecordSearch: Send + Sync {
    async fn search(&self, term: &QueryTerm, cache: CacheMode)
        -> Result<SearchResponse, SearchError>;
}

/// How the family name is matched by the server
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchModifier {
    /// Server default string matching (starts-with, case-insensitive)
    #[default]
    Default,
    Exact,
    Contains,
}

impl MatchModifier {
    pub fn param_name(&self) -> &'static str {
        match self {
            MatchModifier::Default => "family",
            MatchModifier::Exact => "family:exact",
            MatchModifier::Contains => "family:contains",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "default" | "matches" => Some(MatchModifier::Default),
            "exact" => Some(MatchModifier::Exact),
            "contains" => Some(MatchModifier::Contains),
            _ => None,
        }
    }
}

/// FHIR REST client for patient searches
#[derive(Clone)]
pub struct FhirClient {
    http: HttpClient,
    match_modifier: MatchModifier,
}

impl FhirClient {
    /// Create a client against `base_url`, reporting every call to `interceptor`
    pub fn new(
        base_url: impl Into<String>,
        timeout_secs: u64,
        interceptor: Arc<dyn TimingInterceptor>,
    ) -> Result<Self, HttpError> {
        let http = HttpClient::with_timeout(timeout_secs)?
            .base_url(base_url)
            .interceptor(interceptor)
            .default_header("Accept", FHIR_JSON)?;

        Ok(Self {
            http,
            match_modifier: MatchModifier::default(),
        })
    }

    pub fn with_match_modifier(mut self, modifier: MatchModifier) -> Self {
        self.match_modifier = modifier;
        self
    }

    fn build_request(&self, term: &QueryTerm, cache: CacheMode) -> HttpRequest {
        let mut request =
            HttpRequest::get("/Patient").query(self.match_modifier.param_name(), term.as_str());
        if let Some(directive) = cache.header_value() {
            request = request.header("Cache-Control", directive);
        }
        request
    }
}

#[async_trait]
impl RecordSearch for FhirClient {
    async fn search(
        &self,
        term: &QueryTerm,
        cache: CacheMode,
    ) -> Result<SearchResponse, SearchError> {
        if term.as_str().trim().is_empty() {
            return Err(SearchError::EmptyTerm);
        }

        let response = self.http.send(self.build_request(term, cache)).await?;
        let latency = LatencyMeasurement::from_millis(response.duration_ms);

        if !response.is_success() {
            return Err(SearchError::Remote {
                status: response.status_code,
                body: truncate(&response.body, MAX_ERROR_BODY),
            });
        }

        let bundle: Bundle = serde_json::from_str(&response.body)
            .map_err(|e| SearchError::MalformedBody(e.to_string()))?;
        if !bundle.is_bundle() {
            return Err(SearchError::MalformedBody(format!(
                "expected Bundle, got {}",
                bundle.resource_type
            )));
        }

        let page = bundle.into_page();
        debug!(
            "Search {} ({}) returned {} entries in {}",
            term,
            cache,
            page.len(),
            latency
        );

        Ok(SearchResponse { page, latency })
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{CompletedCall, InterceptorChain, LatestTiming};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn smith_bundle() -> serde_json::Value {
        json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "total": 2,
            "entry": [
                {"resource": {"resourceType": "Patient", "name": [{"family": "SMITH", "given": ["Zoe"]}]}},
                {"resource": {"resourceType": "Patient", "name": [{"family": "SMITH", "given": ["Adam"]}], "birthDate": "1980-01-02"}}
            ]
        })
    }

    fn term(s: &str) -> QueryTerm {
        QueryTerm::parse(s).unwrap()
    }

    /// Counts interceptor notifications
    #[derive(Default)]
    struct CallCounter(AtomicUsize);

    impl CallCounter {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl TimingInterceptor for CallCounter {
        fn on_response(&self, _call: &CompletedCall<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn client_at(
        base_url: impl Into<String>,
    ) -> (FhirClient, Arc<LatestTiming>, Arc<CallCounter>) {
        let timing = Arc::new(LatestTiming::new());
        let counter = Arc::new(CallCounter::default());
        let chain = InterceptorChain::new()
            .with(timing.clone())
            .with(counter.clone());
        let client = FhirClient::new(base_url, 5, Arc::new(chain)).unwrap();
        (client, timing, counter)
    }

    async fn client_for(server: &MockServer) -> (FhirClient, Arc<LatestTiming>, Arc<CallCounter>) {
        client_at(server.uri())
    }

    #[tokio::test]
    async fn test_search_returns_page_and_latency() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Patient"))
            .and(query_param("family", "SMITH"))
            .and(header("accept", FHIR_JSON))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(smith_bundle())
                    .set_delay(Duration::from_millis(20)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (client, timing, calls) = client_for(&server).await;
        let response = client
            .search(&term("SMITH"), CacheMode::Enabled)
            .await
            .unwrap();

        assert_eq!(response.page.len(), 2);
        assert_eq!(response.page.total, Some(2));
        assert!(response.latency.duration_ms >= 20);
        assert_eq!(timing.current(), Some(response.latency));
        assert_eq!(calls.count(), 1);
    }

    #[tokio::test]
    async fn test_cache_header_follows_mode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Patient"))
            .respond_with(ResponseTemplate::new(200).set_body_json(smith_bundle()))
            .mount(&server)
            .await;

        let (client, _, calls) = client_for(&server).await;
        client.search(&term("SMITH"), CacheMode::Enabled).await.unwrap();
        client.search(&term("SMITH"), CacheMode::Disabled).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(calls.count(), 2);
        assert!(requests[0].headers.get("cache-control").is_none());
        assert_eq!(
            requests[1]
                .headers
                .get("cache-control")
                .and_then(|v| v.to_str().ok()),
            Some("no-cache")
        );
    }

    #[tokio::test]
    async fn test_exact_match_modifier() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Patient"))
            .and(query_param("family:exact", "SMITH"))
            .respond_with(ResponseTemplate::new(200).set_body_json(smith_bundle()))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _, _) = client_for(&server).await;
        let client = client.with_match_modifier(MatchModifier::Exact);
        tokio_test::assert_ok!(client.search(&term("SMITH"), CacheMode::Enabled).await);
    }

    #[tokio::test]
    async fn test_remote_error_is_timed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let (client, timing, calls) = client_for(&server).await;
        let err = client
            .search(&term("SMITH"), CacheMode::Enabled)
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Remote { status: 503, .. }));
        assert_eq!(err.kind(), "remote");
        assert!(timing.current().is_some());
        assert_eq!(calls.count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"resourceType": "OperationOutcome"})),
            )
            .mount(&server)
            .await;

        let (client, _, calls) = client_for(&server).await;
        let err = client
            .search(&term("SMITH"), CacheMode::Enabled)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::MalformedBody(_)));
        assert_eq!(calls.count(), 1);
    }

    #[tokio::test]
    async fn test_transport_error() {
        let (client, timing, calls) = client_at("http://127.0.0.1:1");

        let err = client
            .search(&term("SMITH"), CacheMode::Disabled)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "transport");
        assert!(timing.current().is_some());
        assert_eq!(calls.count(), 1);
    }

    #[tokio::test]
    async fn test_empty_term_makes_no_call() {
        let server = MockServer::start().await;
        let (client, timing, calls) = client_for(&server).await;
        let blank: QueryTerm = serde_json::from_value(json!("  ")).unwrap();

        let err = client.search(&blank, CacheMode::Enabled).await.unwrap_err();

        assert!(matches!(err, SearchError::EmptyTerm));
        assert!(timing.current().is_none());
        assert_eq!(calls.count(), 0);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
