//! Paperless REST api client
//!
//! # Creating new api client
//!
//! - [new](PaperlessClient::new) - create client from a config
//! - [with_client](PaperlessClient::with_client) - create client with a custom reqwest client builder
//!
//! # Fetching
//!
//! - [documents](PaperlessClient::documents) - lazy page stream of documents
//! - [references](PaperlessClient::references) - lazy page stream of one lookup category
//! - [lookup_table](PaperlessClient::lookup_table) - complete lookup table of one category
//! - [download](PaperlessClient::download) - download a document file (see [`crate::download`])
//!
//! All fetches are best effort: failures end the page stream early and are
//! logged, see [`crate::paged`].

use std::sync::Arc;

use tracing::debug;

use crate::{
    Result,
    auth::Credentials,
    config::DEFAULT_PAGE_SIZE,
    documents::Document,
    http_client::{HttpClient, HttpMetrics, HttpMetricsSnapshot, HttpRequest},
    lookups::{LookupTable, RefCategory, Reference},
    paged::{self, PageStream},
    settings::Settings,
};

/// Connection settings for the Paperless client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base url of the instance, e.g. `http://localhost:8000`
    pub base_url: String,
    pub credentials: Credentials,
    /// Records requested per page
    pub page_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: crate::DEFAULT_INSTANCE_URL.to_string(),
            credentials: Credentials::None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl From<&Settings> for ClientConfig {
    fn from(settings: &Settings) -> Self {
        ClientConfig {
            base_url: settings.instance_url.clone(),
            credentials: settings.credentials(),
            page_size: settings.page_size,
        }
    }
}

/// Client for the subset of the Paperless api used for search.
#[derive(Clone)]
pub struct PaperlessClient {
    pub(crate) client: Arc<HttpClient>,
    config: ClientConfig,
}

impl std::fmt::Debug for PaperlessClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaperlessClient")
            .field("config", &self.config)
            .finish()
    }
}

impl PaperlessClient {
    /// Creates a new client with the provided configuration.
    ///
    /// # Example
    /// ```rust,no_run
    /// use paperless_search::prelude::*;
    /// # fn create_client() -> Result<PaperlessClient, PaperlessError> {
    /// let config = ClientConfig {
    ///     base_url: "http://localhost:8000".into(),
    ///     credentials: Credentials::Token("0123456789abcdef".into()),
    ///     ..Default::default()
    /// };
    /// let client = PaperlessClient::new(config)?;
    /// # Ok(client)
    /// # }
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_client(reqwest::Client::builder(), config)
    }

    /// Creates a client from a `reqwest::ClientBuilder` and configuration.
    /// The timeouts and user agent are always overridden.
    pub fn with_client(builder: reqwest::ClientBuilder, config: ClientConfig) -> Result<Self> {
        Self::with_metrics(builder, config, Arc::new(HttpMetrics::new()))
    }

    /// Creates a client that records into existing metrics, so counters survive
    /// a client rebuild after a settings change.
    pub(crate) fn with_metrics(
        builder: reqwest::ClientBuilder,
        config: ClientConfig,
        metrics: Arc<HttpMetrics>,
    ) -> Result<Self> {
        debug!(url = %config.base_url, "new client");
        let client = HttpClient::new(
            builder,
            &config.base_url,
            config.credentials.clone(),
            metrics,
        )?;
        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    /// Returns the configuration.
    pub fn get_config(&self) -> &ClientConfig {
        &self.config
    }

    /// Base url without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.client.base_url
    }

    /// Returns a snapshot of current HTTP metrics.
    pub fn http_metrics(&self) -> HttpMetricsSnapshot {
        self.client.metrics_snapshot()
    }

    /// Lazy stream of document pages.
    pub fn documents(&self) -> PageStream<Document> {
        let request = HttpRequest::get(self.client.url("/api/documents/"))
            .param("page_size", self.config.page_size);
        paged::page_stream(self.client.clone(), request)
    }

    /// Lazy stream of reference pages for one category.
    pub fn references(&self, category: RefCategory) -> PageStream<Reference> {
        let request = HttpRequest::get(self.client.url(category.path()))
            .param("page_size", self.config.page_size);
        paged::page_stream(self.client.clone(), request)
    }

    /// Fetches every page of a lookup category into a table.
    /// On failure the table holds whatever was fetched before it.
    pub async fn lookup_table(&self, category: RefCategory) -> LookupTable {
        LookupTable::new(category, paged::collect_all(self.references(category)).await)
    }
}
