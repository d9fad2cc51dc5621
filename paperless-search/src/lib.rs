/*
 * paperless-search: launcher search over a Paperless document archive
 *
 * SPDX-FileCopyrightText: 2025-2026 Steve Schoettler
 * SPDX-License-Identifier: Apache-2.0
 */
//! # Paperless launcher search
//!
//! Search documents stored in a Paperless archive from a desktop launcher.
//!
//! ## Features
//!
//! - paged document fetch following the server's `next` cursors, as a lazy stream
//! - tag, document type, and correspondent ids resolved to names once per refresh
//! - lowercase filter string per document, built from the enabled fields
//! - snapshot of enriched documents, published atomically, optionally persisted
//!   to an expiring json file
//! - cancellable background refresh
//! - triggered and global query handling, with download/open/copy actions
//! - basic auth or token auth
//! - http metrics
//! - companion cli tool (`plq`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paperless_search::prelude::*;
//! # async fn example() -> Result<(), PaperlessError> {
//!
//! let mut settings = Settings::default();
//! settings.instance_url = "http://localhost:8000".into();
//! settings.api_token = "0123456789abcdef".into();
//!
//! let plugin = PaperlessSearch::new(settings, std::env::temp_dir().join("paperless"))?;
//! plugin.start().await;
//!
//! // what the launcher calls on each keystroke after the trigger ("pl ")
//! let items = plugin.handle_trigger_query(&TextQuery::new("invoice")).await;
//! for item in &items {
//!     println!("{} ({})", item.text, item.subtext);
//! }
//!
//! plugin.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Data flow
//!
//! A refresh cycle runs
//! `client (paged fetch) -> lookups (resolver) -> enrich (names + filter string) -> store (publish)`.
//! Queries only read the published snapshot. A failure anywhere in the cycle
//! is logged and yields a partial (never mixed) snapshot.
//!
#![allow(clippy::missing_errors_doc)] // pedantic
#![allow(clippy::missing_const_for_fn)] //  nursery function
#![allow(clippy::must_use_candidate)] // pedantic
#![warn(clippy::default_trait_access)]
#![warn(clippy::doc_markdown)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::implicit_clone)]
#![warn(clippy::match_same_arms)]
#![warn(clippy::needless_raw_strings)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::redundant_closure)]
#![warn(clippy::uninlined_format_args)]
#![warn(clippy::unused_async)]

pub mod actions;
pub mod auth;
pub mod client;
pub mod documents;
pub mod download;
pub mod enrich;
pub mod error;
mod http_client;
pub mod lookups;
#[cfg(feature = "mock")]
#[doc(hidden)]
pub mod mock;
pub mod paged;
pub mod plugin;
pub mod query;
pub mod scheduler;
pub mod settings;
pub mod store;

/// Result type alias using `PaperlessError` as the default error.
pub type Result<T, E = crate::error::PaperlessError> = std::result::Result<T, E>;

/// Prelude module - import (nearly) all the things with `use paperless_search::prelude::*;`
pub mod prelude {
    pub use super::{DEFAULT_DOWNLOAD_PATH, DEFAULT_INSTANCE_URL, PAPERLESS_TOKEN_ENV, PAPERLESS_URL_ENV};
    // Error types
    pub use crate::error::*;
    pub use crate::{
        // Result actions and desktop side effects
        actions::{Action, ActionKind, ActionOutcome, Desktop},
        // Credentials
        auth::{Credentials, Secret},
        // Api client
        client::{ClientConfig, PaperlessClient},
        // Documents
        documents::{Document, EnrichedDocument, IndexedDocument, download_url, preview_url},
        // Enrichment
        enrich::{enrich, enrich_document, filter_string},
        // HTTP metrics
        http_client::HttpMetricsSnapshot,
        // Reference lookups
        lookups::{LookupTable, RefCategory, Reference, Resolver},
        // Pagination
        paged::{Page, PageStream},
        // Plugin
        plugin::{PaperlessSearch, PluginStatus},
        // Queries and result items
        query::{LauncherQuery, RankItem, ResultItem, TextQuery},
        // Background refresh
        scheduler::RefreshScheduler,
        // Settings
        settings::{
            ConfigSink, ConfigSource, FilterToggles, SettingKey, SettingKind, SettingValue,
            Settings, SettingsChange,
        },
        // Snapshot store
        store::{Snapshot, SnapshotStore},
    };
}

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default Paperless instance url
pub const DEFAULT_INSTANCE_URL: &str = "http://localhost:8000";

/// Default directory for downloaded documents
pub const DEFAULT_DOWNLOAD_PATH: &str = "~/Downloads";

/// Environment variable overriding the instance url (used by the cli)
pub const PAPERLESS_URL_ENV: &str = "PAPERLESS_URL";

/// Environment variable overriding the api token (used by the cli)
pub const PAPERLESS_TOKEN_ENV: &str = "PAPERLESS_TOKEN";

pub(crate) mod config {
    /// User agent sent with every request
    pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

    /// Connect timeout, and the longest wait for the next chunk of a response (seconds).
    /// A body that keeps arriving has no overall deadline.
    pub const REQUEST_TIMEOUT_SECS: u64 = 5;

    /// Default records per page
    pub const DEFAULT_PAGE_SIZE: u32 = 100;

    /// Maximum records per page accepted by Paperless
    pub const MAX_PAGE_SIZE: u32 = 1000;

    /// Default number of items returned for one query
    pub const DEFAULT_RESULT_LIMIT: usize = 100;

    /// Default snapshot lifetime and refresh period (minutes)
    pub const DEFAULT_CACHE_LENGTH_MINUTES: u32 = 60;

    /// Upper bound for the snapshot lifetime (one week, in minutes)
    pub const MAX_CACHE_LENGTH_MINUTES: i64 = 7 * 24 * 60;

    /// Default typing delay before a triggered query that needs the network (ms)
    pub const DEFAULT_QUERY_DELAY_MS: u64 = 500;

    /// Granularity of the typing delay. Query validity is checked after each step.
    pub const QUERY_POLL_STEP_MS: u64 = 10;

    /// File name used when a download response has no usable Content-Disposition
    pub const DOWNLOAD_FALLBACK_NAME: &str = "paperless_download.pdf";

    /// Snapshot file name inside the instance cache directory
    pub const SNAPSHOT_FILE_NAME: &str = "documents.json";
}
