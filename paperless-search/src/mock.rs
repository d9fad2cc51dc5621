//! Mock Paperless server, for tests and the `paperless-mock-server` binary.
//!
//! Serves the list endpoints used for search (documents, tags, document types,
//! correspondents) with Paperless style pagination (`page`, `page_size`, and
//! absolute `next`/`previous` links), plus document download and preview.
//!
//! Test hooks on [`MockServerHandle`]:
//! - per-path request counters
//! - an injected error status for one page of one endpoint
//! - latency added to every request
//! - slow file bodies, sent in small chunks with a pause before each
//! - optional auth check (token [`MOCK_TOKEN`] or basic auth
//!   [`MOCK_USERNAME`]/[`MOCK_PASSWORD`])

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use base64::Engine;
use bytes::Bytes;
use futures::stream;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::oneshot};
use tracing::debug;

use crate::{documents::Document, lookups::Reference, paged::Page};

pub const MOCK_TOKEN: &str = "mock-token";
pub const MOCK_USERNAME: &str = "mock";
pub const MOCK_PASSWORD: &str = "mock-password";

// Paperless default when the client sends no page_size
const SERVER_PAGE_SIZE: usize = 25;

/// A file served by the download and preview endpoints.
#[derive(Clone, Debug, Default)]
pub struct MockFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// The archive content served by the mock.
#[derive(Clone, Debug, Default)]
pub struct MockData {
    pub documents: Vec<Document>,
    pub tags: Vec<Reference>,
    pub document_types: Vec<Reference>,
    pub correspondents: Vec<Reference>,
    /// Files by document id. Documents without an entry are served as `<title>.pdf`.
    pub files: HashMap<u64, MockFile>,
}

fn reference(id: u64, name: &str) -> Reference {
    Reference {
        id,
        name: name.to_string(),
    }
}

impl MockData {
    /// A small archive: an invoice, a lease and a receipt.
    pub fn sample() -> Self {
        let documents = vec![
            Document {
                id: 1,
                title: "Invoice".into(),
                document_type: Some(2),
                correspondent: None,
                tags: vec![5],
                content: Some("Invoice number 2024-031, total due 120.00".into()),
            },
            Document {
                id: 2,
                title: "Lease agreement".into(),
                document_type: Some(3),
                correspondent: Some(9),
                tags: vec![7],
                content: Some("Rental contract for the apartment".into()),
            },
            Document {
                id: 3,
                title: "Dentist receipt".into(),
                document_type: None,
                correspondent: Some(10),
                tags: vec![5, 7],
                content: None,
            },
        ];
        let mut files = HashMap::new();
        files.insert(
            1,
            MockFile {
                name: "Invoice March 2024.pdf".into(),
                content: b"%PDF-1.4 mock invoice".to_vec(),
            },
        );
        Self {
            documents,
            tags: vec![reference(5, "Finance"), reference(7, "Home")],
            document_types: vec![reference(2, "Bill"), reference(3, "Contract")],
            correspondents: vec![reference(9, "ACME Property"), reference(10, "Dr. Smile")],
            files,
        }
    }

    /// `count` documents titled `Document 1..=count`, all tagged Finance.
    pub fn generated(count: u64) -> Self {
        Self {
            documents: (1..=count)
                .map(|id| Document {
                    id,
                    title: format!("Document {id}"),
                    document_type: Some(2),
                    correspondent: None,
                    tags: vec![5],
                    content: None,
                })
                .collect(),
            tags: vec![reference(5, "Finance")],
            document_types: vec![reference(2, "Bill")],
            correspondents: Vec::new(),
            files: HashMap::new(),
        }
    }
}

struct MockState {
    base_url: String,
    data: RwLock<MockData>,
    requests: Mutex<HashMap<String, u64>>,
    failures: Mutex<HashMap<(String, usize), u16>>,
    latency: Mutex<Duration>,
    /// chunk size and pause for file bodies
    trickle: Mutex<Option<(usize, Duration)>>,
    require_auth: AtomicBool,
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    page: Option<usize>,
    page_size: Option<usize>,
}

/// Handle to a running mock server.
pub struct MockServerHandle {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
    state: Arc<MockState>,
}

impl MockServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://<addr>`, the instance url to configure in clients.
    pub fn base_url(&self) -> String {
        self.state.base_url.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }

    /// Replaces the archive content.
    pub fn set_data(&self, data: MockData) {
        *self.state.data.write() = data;
    }

    /// Edits the archive content in place.
    pub fn update_data(&self, f: impl FnOnce(&mut MockData)) {
        f(&mut self.state.data.write());
    }

    /// Makes `page` (1-based) of the endpoint at `path` fail with `status`.
    pub fn fail_page(&self, path: &str, page: usize, status: u16) {
        self.state
            .failures
            .lock()
            .insert((path.to_string(), page), status);
    }

    pub fn clear_failures(&self) {
        self.state.failures.lock().clear();
    }

    /// Delay added before every response.
    pub fn set_latency(&self, latency: Duration) {
        *self.state.latency.lock() = latency;
    }

    /// Sends file bodies `chunk_size` bytes at a time, pausing `pause` before each chunk.
    pub fn trickle_files(&self, chunk_size: usize, pause: Duration) {
        *self.state.trickle.lock() = Some((chunk_size.max(1), pause));
    }

    /// When on, requests without valid credentials get 401.
    pub fn require_auth(&self, on: bool) {
        self.state.require_auth.store(on, Ordering::SeqCst);
    }

    /// Number of requests received for `path` (query string excluded).
    pub fn request_count(&self, path: &str) -> u64 {
        self.state.requests.lock().get(path).copied().unwrap_or(0)
    }

    pub fn total_requests(&self) -> u64 {
        self.state.requests.lock().values().sum()
    }

    pub fn reset_counts(&self) {
        self.state.requests.lock().clear();
    }
}

/// Mock Paperless server.
pub struct MockPaperlessServer;

impl MockPaperlessServer {
    /// Binds `addr` (use port 0 for any free port) and serves `data` until shutdown.
    pub async fn start(addr: SocketAddr, data: MockData) -> std::io::Result<MockServerHandle> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(MockState {
            base_url: format!("http://{addr}"),
            data: RwLock::new(data),
            requests: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            latency: Mutex::new(Duration::ZERO),
            trickle: Mutex::new(None),
            require_auth: AtomicBool::new(false),
        });
        let app = Router::new()
            .route("/api/documents/", get(list_documents))
            .route("/api/tags/", get(list_tags))
            .route("/api/document_types/", get(list_document_types))
            .route("/api/correspondents/", get(list_correspondents))
            .route("/api/documents/{id}/download/", get(download))
            .route("/api/documents/{id}/preview/", get(preview))
            .with_state(state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });
        debug!(%addr, "mock paperless server started");
        Ok(MockServerHandle {
            addr,
            shutdown: shutdown_tx,
            task,
            state,
        })
    }

    /// Starts on a free port on localhost.
    pub async fn start_local(data: MockData) -> std::io::Result<MockServerHandle> {
        Self::start(SocketAddr::from(([127, 0, 0, 1], 0)), data).await
    }
}

type MockResult = Result<Response, Response>;

impl MockState {
    // counts the request, applies latency, checks auth
    async fn begin(&self, path: &str, headers: &HeaderMap) -> Result<(), Response> {
        *self.requests.lock().entry(path.to_string()).or_default() += 1;
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.require_auth.load(Ordering::SeqCst) && !authorized(headers) {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"detail": "Invalid token."})),
            )
                .into_response());
        }
        Ok(())
    }

    async fn list<T, F>(&self, path: &str, headers: &HeaderMap, params: &ListParams, select: F) -> MockResult
    where
        T: Serialize,
        F: Fn(&MockData) -> Vec<T>,
    {
        self.begin(path, headers).await?;
        let page = params.page.unwrap_or(1).max(1);
        let injected = self.failures.lock().get(&(path.to_string(), page)).copied();
        if let Some(status) = injected {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return Err((status, "injected failure").into_response());
        }
        let page_size = params.page_size.unwrap_or(SERVER_PAGE_SIZE).max(1);
        let items = select(&self.data.read());
        let count = items.len();
        let start = (page - 1) * page_size;
        if page > 1 && start >= count {
            return Err((StatusCode::NOT_FOUND, Json(json!({"detail": "Invalid page."}))).into_response());
        }
        let link = |page: usize| format!("{}{path}?page={page}&page_size={page_size}", self.base_url);
        let body = Page {
            count: Some(count as u64),
            next: (start + page_size < count).then(|| link(page + 1)),
            previous: (page > 1).then(|| link(page - 1)),
            results: items.into_iter().skip(start).take(page_size).collect(),
        };
        Ok(Json(body).into_response())
    }

    async fn file(&self, id: u64, disposition: &str, headers: &HeaderMap, path: &str) -> MockResult {
        self.begin(path, headers).await?;
        let file = {
            let data = self.data.read();
            data.files.get(&id).cloned().or_else(|| {
                data.documents.iter().find(|d| d.id == id).map(|d| MockFile {
                    name: format!("{}.pdf", d.title),
                    content: format!("%PDF-1.4 {}", d.title).into_bytes(),
                })
            })
        };
        let Some(file) = file else {
            return Err((StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response());
        };
        let trickle = *self.trickle.lock();
        let mut response = match trickle {
            Some((chunk_size, pause)) => {
                Body::from_stream(trickle_body(file.content, chunk_size, pause)).into_response()
            }
            None => file.content.into_response(),
        };
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
        if let Ok(value) = HeaderValue::from_str(&content_disposition(disposition, &file.name)) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        Ok(response)
    }
}

fn trickle_body(
    content: Vec<u8>,
    chunk_size: usize,
    pause: Duration,
) -> impl futures::Stream<Item = Result<Bytes, std::convert::Infallible>> {
    let chunks: Vec<Bytes> = content
        .chunks(chunk_size)
        .map(Bytes::copy_from_slice)
        .collect();
    stream::unfold(chunks.into_iter(), move |mut chunks| async move {
        let chunk = chunks.next()?;
        tokio::time::sleep(pause).await;
        Some((Ok(chunk), chunks))
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let basic = base64::engine::general_purpose::STANDARD
        .encode(format!("{MOCK_USERNAME}:{MOCK_PASSWORD}"));
    value == format!("Token {MOCK_TOKEN}") || value == format!("Basic {basic}")
}

fn content_disposition(disposition: &str, filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            _ => ch,
        })
        .collect();
    let encoded =
        percent_encoding::utf8_percent_encode(&sanitized, percent_encoding::NON_ALPHANUMERIC);
    format!("{disposition}; filename=\"{sanitized}\"; filename*=utf-8''{encoded}")
}

async fn list_documents(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> MockResult {
    state
        .list("/api/documents/", &headers, &params, |d| d.documents.clone())
        .await
}

async fn list_tags(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> MockResult {
    state
        .list("/api/tags/", &headers, &params, |d| d.tags.clone())
        .await
}

async fn list_document_types(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> MockResult {
    state
        .list("/api/document_types/", &headers, &params, |d| {
            d.document_types.clone()
        })
        .await
}

async fn list_correspondents(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> MockResult {
    state
        .list("/api/correspondents/", &headers, &params, |d| {
            d.correspondents.clone()
        })
        .await
}

async fn download(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> MockResult {
    let path = format!("/api/documents/{id}/download/");
    state.file(id, "attachment", &headers, &path).await
}

async fn preview(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> MockResult {
    let path = format!("/api/documents/{id}/preview/");
    state.file(id, "inline", &headers, &path).await
}
