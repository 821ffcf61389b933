//! HTTP client used for FHIR searches
//!
//! Every call is timed from just before the request is sent until the body
//! has been read, and the result is reported to the client's interceptor.

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Method,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::interceptor::{CompletedCall, InterceptorChain, TimingInterceptor};
use crate::utils::Timer;

/// HTTP client errors
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Failed to create HTTP client: {0}")]
    Build(String),
}

/// HTTP client with timing capture
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Option<String>,
    default_headers: HeaderMap,
    timeout_secs: u64,
    interceptor: Arc<dyn TimingInterceptor>,
}

impl HttpClient {
    /// Create client with a request timeout
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base_url: None,
            default_headers: HeaderMap::new(),
            timeout_secs,
            interceptor: Arc::new(InterceptorChain::new()),
        })
    }

    /// Set base URL for requests
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Register the interceptor notified after each call
    pub fn interceptor(mut self, interceptor: Arc<dyn TimingInterceptor>) -> Self {
        self.interceptor = interceptor;
        self
    }

    /// Add default header
    pub fn default_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, HttpError> {
        let header_name = HeaderName::from_bytes(key.as_ref().as_bytes())
            .map_err(|_| HttpError::InvalidHeader(key.as_ref().to_string()))?;
        let header_value = HeaderValue::from_str(value.as_ref())
            .map_err(|_| HttpError::InvalidHeader(key.as_ref().to_string()))?;
        self.default_headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Build full URL
    fn build_url(&self, path: &str) -> String {
        match &self.base_url {
            Some(base) => {
                if path.starts_with("http://") || path.starts_with("https://") {
                    path.to_string()
                } else {
                    format!("{}{}", base.trim_end_matches('/'), path)
                }
            }
            None => path.to_string(),
        }
    }

    /// Send HTTP request
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = self.build_url(&request.url);
        let parsed = reqwest::Url::parse(&url).map_err(|_| HttpError::InvalidUrl(url.clone()))?;
        debug!("Sending {} request to {}", request.method, url);

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| HttpError::RequestFailed(format!("invalid method {}", request.method)))?;

        let mut req_builder = self.client.request(method, parsed);

        for (key, value) in &self.default_headers {
            req_builder = req_builder.header(key, value);
        }

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }

        if !request.query.is_empty() {
            req_builder = req_builder.query(&request.query);
        }

        let timer = Timer::start(format!("{} {}", request.method, url));

        let response = match req_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                self.notify(&request.method, &url, timer.stop(), None);
                return Err(self.classify(e, &url));
            }
        };

        let status = response.status();
        let body = response.text().await;
        let elapsed = timer.stop();
        self.notify(&request.method, &url, elapsed, Some(status.as_u16()));
        let body = body.map_err(|e| HttpError::Body(e.to_string()))?;

        let duration_ms = elapsed.as_millis() as u64;
        debug!(
            "Response: {} {} in {}ms",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            duration_ms
        );

        Ok(HttpResponse {
            status_code: status.as_u16(),
            body,
            duration_ms,
        })
    }

    fn notify(&self, method: &str, url: &str, elapsed: Duration, status: Option<u16>) {
        self.interceptor.on_response(&CompletedCall {
            method,
            url,
            elapsed,
            status,
        });
    }

    fn classify(&self, e: reqwest::Error, url: &str) -> HttpError {
        if e.is_timeout() {
            HttpError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            HttpError::ConnectionRefused(url.to_string())
        } else {
            HttpError::RequestFailed(e.to_string())
        }
    }
}

/// HTTP request builder
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub query: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            query: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// HTTP response with the body read to the end
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
    pub duration_ms: u64,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::LatestTiming;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_http_request_builder() {
        let req = HttpRequest::get("/Patient")
            .header("Accept", "application/fhir+json")
            .header("Cache-Control", "no-cache")
            .query("family", "SMITH");

        assert_eq!(req.method, "GET");
        assert_eq!(req.headers.len(), 2);
        assert_eq!(req.query, vec![("family".to_string(), "SMITH".to_string())]);
    }

    #[test]
    fn test_http_response() {
        let ok = HttpResponse {
            status_code: 200,
            body: "{}".to_string(),
            duration_ms: 100,
        };
        let not_found = HttpResponse {
            status_code: 404,
            ..ok.clone()
        };

        assert!(ok.is_success());
        assert!(!not_found.is_success());
    }

    #[test]
    fn test_build_url() {
        let client = HttpClient::with_timeout(30).unwrap().base_url("http://hapi.example/baseR4/");
        assert_eq!(
            client.build_url("/Patient"),
            "http://hapi.example/baseR4/Patient"
        );
        assert_eq!(
            client.build_url("https://other.example/x"),
            "https://other.example/x"
        );
    }

    #[tokio::test]
    async fn test_send_reports_to_interceptor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Patient"))
            .and(query_param("family", "SMITH"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(Duration::from_millis(30)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let timing = Arc::new(LatestTiming::new());
        let client = HttpClient::with_timeout(30)
            .unwrap()
            .base_url(server.uri())
            .interceptor(timing.clone());

        let resp = client
            .send(HttpRequest::get("/Patient").query("family", "SMITH"))
            .await
            .unwrap();

        assert!(resp.is_success());
        let captured = timing.current().unwrap();
        assert!(captured.duration_ms >= 30);
        assert_eq!(captured.duration_ms, resp.duration_ms);
    }

    #[tokio::test]
    async fn test_transport_failure_still_captured() {
        let timing = Arc::new(LatestTiming::new());
        let client = HttpClient::with_timeout(5)
            .unwrap()
            .base_url("http://127.0.0.1:1")
            .interceptor(timing.clone());

        let result = client.send(HttpRequest::get("/Patient")).await;

        assert!(result.is_err());
        assert!(timing.current().is_some());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let client = HttpClient::with_timeout(30).unwrap();
        let result = client.send(HttpRequest::get("not a url")).await;
        assert!(matches!(result, Err(HttpError::InvalidUrl(_))));
    }
}
