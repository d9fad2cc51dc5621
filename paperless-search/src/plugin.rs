//! # Paperless launcher plugin
//!
//! [`PaperlessSearch`] is what the launcher host talks to. It owns the api
//! client, the snapshot store and the background scheduler, and runs refresh
//! cycles:
//!
//! ```text
//! client.documents() --pages--> enrich(resolver) --IndexedDocument--> store.publish()
//! ```
//!
//! Queries never fail. Network and file errors inside a refresh are logged, and
//! the query is answered from whatever snapshot is published.
//!
//! Settings changes go through [`PaperlessSearch::apply_settings`], the only
//! place that rebuilds the client, invalidates or deletes the snapshot, and
//! restarts the scheduler.

use std::{
    path::PathBuf,
    sync::{Arc, Weak},
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    Result,
    actions::{Action, ActionKind, ActionOutcome, Desktop},
    client::{ClientConfig, PaperlessClient},
    config::QUERY_POLL_STEP_MS,
    documents::IndexedDocument,
    enrich::enrich,
    error::PaperlessError,
    http_client::{HttpMetrics, HttpMetricsSnapshot},
    lookups::Resolver,
    query::{LauncherQuery, RankItem, ResultItem},
    scheduler::RefreshScheduler,
    settings::{FilterToggles, Settings, SettingsChange},
    store::{Snapshot, SnapshotStore},
};

/// State reported by [`PaperlessSearch::status`].
#[derive(Clone, Debug, Serialize)]
pub struct PluginStatus {
    pub instance_url: String,
    /// Generation of the published snapshot. Zero if none.
    pub generation: u64,
    pub documents: usize,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// True if triggered queries are answered without network access
    pub fresh: bool,
    pub cache_results: bool,
    pub snapshot_file: Option<PathBuf>,
    pub scheduler_running: bool,
    pub refresh_period_minutes: Option<u64>,
    pub http: HttpMetricsSnapshot,
}

/// The launcher plugin.
pub struct PaperlessSearch {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PaperlessSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaperlessSearch")
            .field("settings", &*self.inner.settings.read())
            .field("generation", &self.inner.store.current().generation)
            .finish()
    }
}

struct Inner {
    settings: RwLock<Settings>,
    client: RwLock<PaperlessClient>,
    metrics: Arc<HttpMetrics>,
    store: SnapshotStore,
    scheduler: RefreshScheduler,
    /// Held for the duration of a refresh cycle, and while settings are swapped,
    /// so a cycle never mixes two configurations.
    refresh_lock: Mutex<()>,
    cache_dir: PathBuf,
}

impl PaperlessSearch {
    /// Creates the plugin. `cache_dir` is the host's cache directory; the
    /// snapshot file goes in an instance specific directory below it.
    ///
    /// A snapshot file left by a previous run is loaded and published.
    /// Nothing is fetched until [`start`](Self::start) or the first query.
    pub fn new(settings: Settings, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        settings.validate()?;
        let metrics = Arc::new(HttpMetrics::new());
        let client = PaperlessClient::with_metrics(
            reqwest::Client::builder(),
            ClientConfig::from(&settings),
            metrics.clone(),
        )?;
        let inner = Inner {
            settings: RwLock::new(settings),
            client: RwLock::new(client),
            metrics,
            store: SnapshotStore::new(),
            scheduler: RefreshScheduler::new(),
            refresh_lock: Mutex::new(()),
            cache_dir: cache_dir.into(),
        };
        inner.update_snapshot_file();
        inner.load_snapshot_file();
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Starts background refresh if enabled. The first refresh runs before this
    /// returns, unless a fresh snapshot was loaded from file.
    pub async fn start(&self) {
        if self.inner.settings.read().scheduler_enabled() {
            self.inner.refresh_if_stale().await;
            self.start_scheduler().await;
        }
    }

    /// Stops background refresh and waits for it to exit.
    pub async fn shutdown(&self) {
        self.inner.scheduler.stop().await;
    }

    pub fn settings(&self) -> Settings {
        self.inner.settings.read().clone()
    }

    /// Replaces the settings and runs every side effect of the change:
    ///
    /// - url or credentials changed: the client is rebuilt
    /// - url, credentials, filters or cache length changed: the snapshot is invalidated
    /// - caching turned off: the snapshot is invalidated and its file deleted
    /// - auto cache, caching or cache length changed: the scheduler is stopped,
    ///   and started again if still enabled
    pub async fn apply_settings(&self, settings: Settings) -> Result<SettingsChange> {
        settings.validate()?;
        let change = {
            let _cycle = self.inner.refresh_lock.lock().await;
            let old = self.inner.settings.read().clone();
            let change = SettingsChange::between(&old, &settings);

            if change.connection || old.page_size != settings.page_size {
                let client = PaperlessClient::with_metrics(
                    reqwest::Client::builder(),
                    ClientConfig::from(&settings),
                    self.inner.metrics.clone(),
                )?;
                *self.inner.client.write() = client;
            }
            if change.cache_disabled
                && let Err(e) = self.inner.store.delete_file()
            {
                warn!("deleting snapshot file: {e}");
            }
            *self.inner.settings.write() = settings;
            self.inner.update_snapshot_file();
            if change.invalidates_snapshot() {
                self.inner.store.invalidate();
            }
            if change.connection {
                self.inner.load_snapshot_file();
            }
            change
        };
        debug!(?change, "settings applied");

        if change.scheduler {
            self.inner.scheduler.stop().await;
            if self.inner.settings.read().scheduler_enabled() {
                self.start_scheduler().await;
            }
        }
        Ok(change)
    }

    async fn start_scheduler(&self) {
        let period = self.inner.settings.read().cache_length();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner
            .scheduler
            .start(period, move || {
                let weak = weak.clone();
                async move {
                    if let Some(inner) = weak.upgrade()
                        && let Err(e) = inner.refresh().await
                    {
                        warn!("scheduled refresh: {e}");
                    }
                }
            })
            .await;
    }

    /// Runs a full refresh cycle and publishes the result, even if the current
    /// snapshot is fresh. Fetch failures produce a partial snapshot; only a
    /// failure to write the snapshot file is returned (after publishing).
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        self.inner.refresh().await
    }

    /// The published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.current()
    }

    /// Answers a triggered query (`pl <text>`).
    ///
    /// An empty query returns the prompt item, and the refresh item if caching
    /// is on. Otherwise matching documents are returned, up to the result limit.
    /// If answering needs the network, the handler first waits for the typing
    /// delay and returns nothing if the query is abandoned meanwhile.
    pub async fn handle_trigger_query(&self, query: &dyn LauncherQuery) -> Vec<ResultItem> {
        let settings = self.settings();
        let text = query.text().trim();
        if text.is_empty() {
            let mut items = vec![ResultItem::prompt()];
            if settings.cache_results {
                items.push(ResultItem::refresh());
            }
            return items;
        }

        let needs_network =
            !settings.cache_results || !self.inner.store.is_fresh(&settings.filters);
        if needs_network && !wait_for_typing(query, settings.query_delay).await {
            debug!(query = text, "query abandoned");
            return Vec::new();
        }

        let base_url = self.inner.client().base_url().to_string();
        if settings.cache_results {
            let snapshot = self.inner.refresh_if_stale().await;
            let items = snapshot
                .search(text)
                .take(settings.result_limit)
                .map(|doc| ResultItem::for_document(&base_url, &doc.document))
                .collect();
            items
        } else {
            let (documents, _) = self.inner.build().await;
            let needle = text.to_lowercase();
            documents
                .iter()
                .filter(|doc| doc.matches(&needle))
                .take(settings.result_limit)
                .map(|doc| ResultItem::for_document(&base_url, &doc.document))
                .collect()
        }
    }

    /// Answers a global (untriggered) query from the published snapshot only.
    /// Never touches the network. Every match has score 0.
    pub fn handle_global_query(&self, query: &dyn LauncherQuery) -> Vec<RankItem> {
        let text = query.text().trim();
        if text.is_empty() {
            return Vec::new();
        }
        let snapshot = self.inner.store.current();
        let base_url = self.inner.client().base_url().to_string();
        let items = snapshot
            .search(text)
            .map(|doc| RankItem {
                item: ResultItem::for_document(&base_url, &doc.document),
                score: 0,
            })
            .collect();
        items
    }

    /// Runs one action of a result item.
    pub async fn run_action(&self, action: &Action, desktop: &dyn Desktop) -> Result<ActionOutcome> {
        debug!(action = %action.id, document = ?action.document_id, "run action");
        match action.id {
            ActionKind::Download => {
                let id = action.document_id.ok_or_else(|| missing(action, "document id"))?;
                let dir = self.inner.settings.read().download_dir();
                let path = self.inner.client().download(id, &dir).await?;
                desktop.open_path(&path)?;
                Ok(ActionOutcome::Downloaded { path })
            }
            ActionKind::Open => {
                let url = action.url.clone().ok_or_else(|| missing(action, "url"))?;
                desktop.open_url(&url)?;
                Ok(ActionOutcome::Opened { url })
            }
            ActionKind::CopyPreviewUrl | ActionKind::CopyDownloadUrl => {
                let text = action.url.clone().ok_or_else(|| missing(action, "url"))?;
                desktop.set_clipboard_text(&text)?;
                Ok(ActionOutcome::Copied { text })
            }
            ActionKind::Refresh => {
                let snapshot = self.refresh().await?;
                Ok(ActionOutcome::Refreshed {
                    generation: snapshot.generation,
                    documents: snapshot.len(),
                })
            }
        }
    }

    pub fn http_metrics(&self) -> HttpMetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    pub async fn status(&self) -> PluginStatus {
        let settings = self.settings();
        let snapshot = self.inner.store.current();
        let published = snapshot.is_published();
        let period = self.inner.scheduler.period().await;
        PluginStatus {
            instance_url: settings.instance_url.clone(),
            generation: snapshot.generation,
            documents: snapshot.len(),
            created_at: published.then_some(snapshot.created_at),
            expires_at: published.then_some(snapshot.expires_at),
            fresh: settings.cache_results && snapshot.is_fresh(Utc::now(), &settings.filters),
            cache_results: settings.cache_results,
            snapshot_file: self.inner.store.file(),
            scheduler_running: period.is_some(),
            refresh_period_minutes: period.map(|p| p.as_secs() / 60),
            http: self.http_metrics(),
        }
    }
}

impl Inner {
    fn client(&self) -> PaperlessClient {
        self.client.read().clone()
    }

    // snapshot file follows the instance url, and exists only while caching is on
    fn update_snapshot_file(&self) {
        let settings = self.settings.read();
        let path = settings
            .cache_results
            .then(|| SnapshotStore::snapshot_path(&self.cache_dir, &settings.instance_url));
        self.store.set_file(path);
    }

    fn load_snapshot_file(&self) {
        if let Err(e) = self.store.load_file() {
            warn!("ignoring unreadable snapshot file: {e}");
        }
    }

    /// Fetches and enriches every document with the current settings.
    async fn build(&self) -> (Vec<IndexedDocument>, FilterToggles) {
        let client = self.client();
        let filters = self.settings.read().filters;
        let resolver = Resolver::fetch(&client).await;
        let documents: Vec<IndexedDocument> =
            enrich(client.documents(), Arc::new(resolver), filters)
                .collect()
                .await;
        (documents, filters)
    }

    async fn refresh(&self) -> Result<Arc<Snapshot>> {
        let _cycle = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<Arc<Snapshot>> {
        let started = std::time::Instant::now();
        let (documents, filters) = self.build().await;
        let lifetime = self.settings.read().cache_length();
        let snapshot = self.store.publish(documents, filters, lifetime);
        info!(
            generation = snapshot.generation,
            documents = snapshot.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "refreshed"
        );
        self.store.save_file(&snapshot)?;
        Ok(snapshot)
    }

    /// Returns the published snapshot if it is fresh, otherwise refreshes first.
    /// Concurrent callers share one refresh.
    async fn refresh_if_stale(&self) -> Arc<Snapshot> {
        let filters = self.settings.read().filters;
        if self.store.is_fresh(&filters) {
            debug!("cache hit");
            return self.store.current();
        }
        let _cycle = self.refresh_lock.lock().await;
        // another caller may have refreshed while we waited
        let filters = self.settings.read().filters;
        if self.store.is_fresh(&filters) {
            return self.store.current();
        }
        debug!("cache miss");
        match self.refresh_locked().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("saving snapshot: {e}");
                self.store.current()
            }
        }
    }
}

// Sleeps `delay_ms` in small steps. Returns false as soon as the query is abandoned.
async fn wait_for_typing(query: &dyn LauncherQuery, delay_ms: u64) -> bool {
    for _ in 0..delay_ms / QUERY_POLL_STEP_MS {
        sleep(Duration::from_millis(QUERY_POLL_STEP_MS)).await;
        if !query.is_valid() {
            return false;
        }
    }
    query.is_valid()
}

fn missing(action: &Action, what: &str) -> PaperlessError {
    PaperlessError::Other {
        message: format!("action {} has no {what}", action.id),
    }
}
