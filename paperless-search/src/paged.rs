//! Paginated results from Paperless list endpoints.
//!
//! Paperless wraps every list response in an envelope
//! `{count, next, previous, results}`, where `next` is the absolute url of the
//! following page or null on the last page.
//!
//! [`page_stream`] turns that cursor chain into a lazy stream with one item per
//! page. Pages are only requested when the consumer polls for them. The stream
//! never yields an error: a failed request (timeout, connection error, non-2xx
//! status, bad json) is logged as a warning and ends the stream, so consumers
//! see the pages fetched before the failure and nothing after it.
//!
use std::sync::Arc;

use futures::{
    StreamExt,
    stream::{self, BoxStream, unfold},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    error::PaperlessError,
    http_client::{HttpClient, HttpRequest},
};

/// Stream of pages. Each item is the `results` list of one page.
pub type PageStream<T> = BoxStream<'static, Vec<T>>;

/// The Paperless pagination envelope.
#[derive(Debug, Deserialize, Serialize)]
pub struct Page<T> {
    /// Total number of records across all pages
    #[serde(default)]
    pub count: Option<u64>,
    /// Absolute url of the next page, or None on the last page
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns true if there are no items in this page.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Follows `next` cursors starting at `first`, yielding one results list per page.
pub(crate) fn page_stream<T>(client: Arc<HttpClient>, first: HttpRequest) -> PageStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    unfold(Some(first), move |next| {
        let client = client.clone();
        async move {
            let request = next?;
            match client.send::<Page<T>>(request.clone()).await {
                Ok(page) => {
                    debug!(
                        url = %request.url,
                        items = page.len(),
                        more = page.next.is_some(),
                        "page"
                    );
                    let next = page.next.map(HttpRequest::get);
                    Some((page.results, next))
                }
                Err(e) => {
                    log_page_failure(&request.url, &e);
                    None
                }
            }
        }
    })
    .boxed()
}

/// Flattens a page stream into a stream of records.
pub fn into_items<T: Send + 'static>(pages: PageStream<T>) -> BoxStream<'static, T> {
    pages.flat_map(stream::iter).boxed()
}

/// Drains a page stream into one vector.
pub async fn collect_all<T: Send + 'static>(pages: PageStream<T>) -> Vec<T> {
    into_items(pages).collect().await
}

fn log_page_failure(url: &str, err: &PaperlessError) {
    match err {
        PaperlessError::ApiError { code, .. } => {
            warn!(url, status = *code, "Got response {code} querying {url}");
        }
        e if e.is_timeout() => {
            warn!(url, "Connection timed out for {url} - exiting");
        }
        e => {
            warn!(url, error = %e, "Request failed for {url} - exiting");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct TestItem {
        id: u64,
        name: String,
    }

    #[test]
    fn test_page_envelope() {
        let page: Page<TestItem> = serde_json::from_str(
            r#"{"count": 3, "next": "http://x/api/tags/?page=2", "previous": null,
                "results": [{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]}"#,
        )
        .expect("page");
        assert_eq!(page.len(), 2);
        assert_eq!(page.count, Some(3));
        assert_eq!(page.next.as_deref(), Some("http://x/api/tags/?page=2"));
    }

    #[test]
    fn test_last_page_envelope() {
        let page: Page<TestItem> =
            serde_json::from_str(r#"{"next": null, "results": []}"#).expect("page");
        assert!(page.is_empty());
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn test_into_items_flattens_in_order() {
        let pages: PageStream<u64> = stream::iter(vec![vec![1, 2], vec![], vec![3]]).boxed();
        let items = collect_all(pages).await;
        assert_eq!(items, vec![1, 2, 3]);
    }
}
