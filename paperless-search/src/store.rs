//! # Snapshot store
//!
//! Holds the enriched document set served to queries.
//!
//! The published [`Snapshot`] is an `Arc` behind a lock. A refresh builds the
//! complete next snapshot off to the side, then [`SnapshotStore::publish`]
//! replaces the `Arc` in a single assignment. Readers clone the `Arc` and keep
//! reading their generation even if a newer one is published meanwhile, so a
//! query never sees documents from two refresh cycles.
//!
//! The snapshot can also be persisted to a json file in an instance specific
//! directory. The file carries its own expiry time and the filter toggles it was
//! built with, and is written to a temporary file and renamed into place.
//!

/*
 # Notes on locking

 - The refresh cycle is the only writer. Queries only read.
 - Each locked section performs exactly one operation (clone or assign of an Arc).
   The lock is never held across an await or while building a snapshot.
 - parking_lot locks don't poison, and since the locked sections can't leave
   partial state behind, a panic elsewhere cannot corrupt the store.
*/

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use snafu::prelude::*;
use tracing::{debug, info};

use crate::{
    Result,
    config::SNAPSHOT_FILE_NAME,
    documents::IndexedDocument,
    error::{IoSnafu, PaperlessError, SerializationSnafu},
    http_client::deserialize_json,
    settings::FilterToggles,
};

/// The enriched documents of one refresh cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Increases with every publish. Zero means nothing has been published.
    pub generation: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Filter toggles used to build the filter strings
    pub filters: FilterToggles,
    pub documents: Vec<IndexedDocument>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Snapshot {
    /// The placeholder published before the first refresh and after invalidation.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            expires_at: DateTime::<Utc>::UNIX_EPOCH,
            filters: FilterToggles::default(),
            documents: Vec::new(),
        }
    }

    /// True if this snapshot came from a refresh cycle (even one that found no documents).
    pub fn is_published(&self) -> bool {
        self.generation > 0
    }

    /// True if the snapshot can answer queries for `filters` at time `now`
    /// without a refresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, filters: &FilterToggles) -> bool {
        self.is_published() && now < self.expires_at && self.filters == *filters
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents whose filter string contains the query, ignoring case
    /// and surrounding whitespace.
    pub fn search<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a IndexedDocument> + 'a {
        let needle = query.trim().to_lowercase();
        self.documents.iter().filter(move |doc| doc.matches(&needle))
    }
}

/// Owner of the published snapshot and its optional file.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
    file: Mutex<Option<PathBuf>>,
    generation: AtomicU64,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// A store without file persistence.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
            file: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Path of the snapshot file for one instance:
    /// `<cache_dir>/<first 16 hex digits of sha256(instance_url)>/documents.json`.
    pub fn snapshot_path(cache_dir: &Path, instance_url: &str) -> PathBuf {
        let digest = Sha256::digest(instance_url.trim_end_matches('/').as_bytes());
        let mut dir = hex::encode(digest);
        dir.truncate(16);
        cache_dir.join(dir).join(SNAPSHOT_FILE_NAME)
    }

    /// Returns the published snapshot. Cheap: clones an Arc.
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// True if the published snapshot is usable for `filters` right now.
    pub fn is_fresh(&self, filters: &FilterToggles) -> bool {
        self.current().is_fresh(Utc::now(), filters)
    }

    /// Builds and publishes the next generation, expiring `lifetime` from now.
    pub fn publish(
        &self,
        documents: Vec<IndexedDocument>,
        filters: FilterToggles,
        lifetime: Duration,
    ) -> Arc<Snapshot> {
        let created_at = Utc::now();
        let expires_at = TimeDelta::from_std(lifetime)
            .ok()
            .and_then(|delta| created_at.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let snapshot = Arc::new(Snapshot {
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
            created_at,
            expires_at,
            filters,
            documents,
        });
        self.swap(snapshot.clone());
        debug!(
            generation = snapshot.generation,
            documents = snapshot.len(),
            "published snapshot"
        );
        snapshot
    }

    /// Discards the published snapshot. The next query that needs documents refreshes.
    pub fn invalidate(&self) {
        self.swap(Arc::new(Snapshot::empty()));
        debug!("snapshot invalidated");
    }

    fn swap(&self, snapshot: Arc<Snapshot>) {
        *self.current.write() = snapshot;
    }

    /// Sets (or clears) the snapshot file location.
    pub fn set_file(&self, path: Option<PathBuf>) {
        *self.file.lock() = path;
    }

    pub fn file(&self) -> Option<PathBuf> {
        self.file.lock().clone()
    }

    /// Loads the snapshot file, if there is one, and publishes it unchanged
    /// (its expiry and filter toggles are kept, so a stale file is loaded but not fresh).
    /// Returns None if no file is configured or the file does not exist.
    pub fn load_file(&self) -> Result<Option<Arc<Snapshot>>> {
        let Some(path) = self.file() else {
            return Ok(None);
        };
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PaperlessError::Io { path, source }),
        };
        let snapshot: Snapshot = deserialize_json(&bytes)?;
        self.generation
            .fetch_max(snapshot.generation, Ordering::SeqCst);
        let snapshot = Arc::new(snapshot);
        self.swap(snapshot.clone());
        info!(
            path = %path.display(),
            generation = snapshot.generation,
            documents = snapshot.len(),
            expires = %snapshot.expires_at,
            "loaded snapshot file"
        );
        Ok(Some(snapshot))
    }

    /// Writes the snapshot to the configured file, replacing the whole file.
    /// Does nothing if no file is configured.
    pub fn save_file(&self, snapshot: &Snapshot) -> Result<()> {
        let Some(path) = self.file() else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context(IoSnafu { path: dir })?;
        }
        let data = serde_json::to_vec(snapshot).context(SerializationSnafu)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data).context(IoSnafu { path: &tmp })?;
        fs::rename(&tmp, &path).context(IoSnafu { path: &path })?;
        debug!(path = %path.display(), generation = snapshot.generation, "saved snapshot file");
        Ok(())
    }

    /// Removes the snapshot file. A missing file is not an error.
    pub fn delete_file(&self) -> Result<()> {
        let Some(path) = self.file() else {
            return Ok(());
        };
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "deleted snapshot file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PaperlessError::Io { path, source }),
        }
    }
}
