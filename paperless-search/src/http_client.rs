//! HttpClient middleware used by PaperlessClient
//!
//! Responsible for
//!  - handing all HTTP api requests
//!  - attaching credentials and the user agent
//!  - logging/tracing
//!  - metrics
//!
//! There are no retries: a failed request ends the operation that issued it,
//! and callers decide whether that failure is absorbed or reported.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use reqwest::{ClientBuilder, Method};
use serde::de::DeserializeOwned;
use snafu::prelude::*;
use tracing::{debug, error, trace};

use crate::{
    Result,
    auth::Credentials,
    config::{REQUEST_TIMEOUT_SECS, USER_AGENT},
    error::{HttpSnafu, PaperlessError},
};

/// HTTP metrics tracked using atomic counters for thread-safe access.
/// These counters are cumulative and never reset during the client's lifetime.
#[derive(Debug, Default)]
pub struct HttpMetrics {
    /// Total number of HTTP requests sent to the server
    total_requests: AtomicU64,
    /// Total number of successful responses (2xx status codes)
    successful_responses: AtomicU64,
    /// Total number of failed requests (non-2xx responses, timeouts, connection errors)
    errors: AtomicU64,
    /// Total bytes received in response bodies
    bytes_received: AtomicU64,
}

impl HttpMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of current metrics as plain u64 values
    pub fn snapshot(&self) -> HttpMetricsSnapshot {
        HttpMetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_responses: self.successful_responses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }

    fn increment_requests(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_success(&self) {
        self.successful_responses.fetch_add(1, Ordering::Relaxed);
    }

    fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_bytes_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of HTTP metrics with plain u64 values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct HttpMetricsSnapshot {
    /// Total number of HTTP requests sent to the server
    pub total_requests: u64,
    /// Total number of successful responses (2xx status codes)
    pub successful_responses: u64,
    /// Total number of failed requests
    pub errors: u64,
    /// Total bytes received in response bodies
    pub bytes_received: u64,
}

impl std::fmt::Display for HttpMetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "requests={} success={} errors={} recv={}",
            self.total_requests,
            self.successful_responses,
            self.errors,
            format_bytes(self.bytes_received),
        )
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes}B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// A GET against an absolute url. Pagination cursors from the server are
/// absolute urls, so requests carry the full url rather than a path.
#[derive(Clone, Default)]
pub(crate) struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query", &self.query)
            .finish()
    }
}

impl HttpRequest {
    pub(crate) fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            query: Vec::new(),
        }
    }

    pub(crate) fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug)]
pub(crate) struct HttpClient {
    client: reqwest::Client,

    /// Base URL of the Paperless instance, without trailing slash (e.g., "http://localhost:8000")
    pub base_url: String,

    credentials: Credentials,

    /// HTTP request/response metrics
    pub metrics: Arc<HttpMetrics>,
}

impl HttpClient {
    pub fn new(
        builder: ClientBuilder,
        base_url: &str,
        credentials: Credentials,
        metrics: Arc<HttpMetrics>,
    ) -> Result<Self> {
        let client = builder
            .connect_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .read_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context(HttpSnafu {
                method: "client-init",
                url: "",
            })?;
        Ok(HttpClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            metrics,
        })
    }

    /// Returns a snapshot of current HTTP metrics
    pub fn metrics_snapshot(&self) -> HttpMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Joins an api path onto the instance base url.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request and deserializes the json response body into T.
    pub(crate) async fn send<T: DeserializeOwned>(&self, req: HttpRequest) -> Result<T> {
        let response = self.execute(&req).await?;
        let body = response.bytes().await.context(HttpSnafu {
            method: req.method.to_string(),
            url: req.url.clone(),
        })?;
        self.metrics.add_bytes_received(body.len() as u64);
        log_response(&req.url, &body);
        deserialize_json(&body)
    }

    /// Sends the request and returns the response if the status is 2xx.
    /// The body is left unread so callers can stream it.
    pub(crate) async fn execute(&self, req: &HttpRequest) -> Result<reqwest::Response> {
        let mut builder = self.client.request(req.method.clone(), &req.url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        let builder = self.credentials.apply(builder);

        // debug log (if tracing enabled)
        log_request(&builder);
        debug!(url = %req.url, "{} request", req.method);

        self.metrics.increment_requests();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(source) => {
                self.metrics.increment_errors();
                return Err(PaperlessError::Http {
                    method: req.method.to_string(),
                    url: req.url.clone(),
                    source,
                });
            }
        };

        let code = response.status();
        debug!(url = %req.url, status = code.as_u16(), "response");
        if !code.is_success() {
            self.metrics.increment_errors();
            let message = response.text().await.unwrap_or_default();
            return Err(PaperlessError::ApiError {
                code: code.as_u16(),
                method: req.method.to_string(),
                url: req.url.clone(),
                message,
            });
        }
        self.metrics.increment_success();
        Ok(response)
    }
}

// dump request
// requires RUST_LOG=paperless_search::http_json=trace
fn log_request(builder: &reqwest::RequestBuilder) {
    if tracing::enabled!(target: "paperless_search::http_json", tracing::Level::TRACE)
        && let Some(req) = builder.try_clone().and_then(|b| b.build().ok())
    {
        // don't log headers so we don't leak credentials
        trace!(target: "paperless_search::http_json", "{} url={}", req.method(), req.url());
    }
}

// dump json response, for debugging
fn log_response(url: &str, body: &Bytes) {
    if tracing::enabled!(target: "paperless_search::http_json", tracing::Level::TRACE) {
        trace!(target: "paperless_search::http_json", "Response url={url} body={}",
            String::from_utf8_lossy(body)
        );
    }
}

// deserialize, reporting errors with 'serde_path_to_error', which provides
// detailed json path to the error
pub(crate) fn deserialize_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    match serde_path_to_error::deserialize(&mut deserializer) {
        Ok(value) => Ok(value),
        Err(err) => {
            error!("Deserialization failed at {}: {}", err.path(), err);
            Err(PaperlessError::Deserialization {
                source: err.into_inner(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(12), "12B");
        assert_eq!(format_bytes(2048), "2.0KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0MB");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = HttpClient::new(
            reqwest::Client::builder(),
            "http://paper.local:8000/",
            Credentials::None,
            Arc::new(HttpMetrics::new()),
        )
        .expect("client");
        assert_eq!(
            client.url("/api/tags/"),
            "http://paper.local:8000/api/tags/"
        );
    }

    #[test]
    fn test_deserialize_json_reports_error() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Item {
            id: u64,
        }
        let err = deserialize_json::<Item>(br#"{"id": "nope"}"#).expect_err("bad id");
        assert!(matches!(err, PaperlessError::Deserialization { .. }));
    }

    #[test]
    fn test_request_params() {
        let req = HttpRequest::get("http://x/api/documents/").param("page_size", 25);
        assert_eq!(req.method, Method::GET);
        assert_eq!(
            req.query,
            vec![("page_size".to_string(), "25".to_string())]
        );
    }
}
