//! Shared test utilities for paperless-search integration tests
//!
//! Every test runs against its own in-process mock Paperless server
//! (see `paperless_search::mock`) on a free localhost port, with temporary
//! cache and download directories.
#![cfg(test)]
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use paperless_search::mock::{MOCK_TOKEN, MockData, MockPaperlessServer, MockServerHandle};
use paperless_search::prelude::*;
use tempfile::TempDir;

pub type TestResult<T = ()> = anyhow::Result<T>;

/// A mock server plus scratch directories.
pub struct TestEnv {
    pub server: MockServerHandle,
    pub cache_dir: TempDir,
    pub download_dir: TempDir,
}

impl TestEnv {
    pub async fn start(data: MockData) -> TestResult<Self> {
        Ok(Self {
            server: MockPaperlessServer::start_local(data).await?,
            cache_dir: tempfile::tempdir()?,
            download_dir: tempfile::tempdir()?,
        })
    }

    pub async fn sample() -> TestResult<Self> {
        Self::start(MockData::sample()).await
    }

    /// Settings pointing at the mock server, with token auth and no typing delay.
    pub fn settings(&self) -> Settings {
        Settings {
            instance_url: self.server.base_url(),
            api_token: Secret::new(MOCK_TOKEN),
            download_path: self.download_dir.path().display().to_string(),
            query_delay: 0,
            ..Settings::default()
        }
    }

    pub fn plugin(&self, settings: Settings) -> TestResult<PaperlessSearch> {
        Ok(PaperlessSearch::new(settings, self.cache_dir.path())?)
    }

    /// Where the plugin keeps the snapshot file for this server.
    pub fn snapshot_file(&self) -> PathBuf {
        SnapshotStore::snapshot_path(self.cache_dir.path(), &self.server.base_url())
    }

    pub async fn shutdown(self) {
        self.server.shutdown().await;
    }
}

/// Item titles, in result order.
pub fn titles(items: &[ResultItem]) -> Vec<String> {
    items.iter().map(|item| item.text.clone()).collect()
}

/// Document ids of a snapshot, in snapshot order.
pub fn snapshot_ids(snapshot: &Snapshot) -> Vec<u64> {
    snapshot.documents.iter().map(|d| d.document.id).collect()
}

/// Desktop side effects recorded instead of performed.
#[derive(Debug, Default)]
pub struct RecordingDesktop {
    pub events: Mutex<Vec<DesktopEvent>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DesktopEvent {
    OpenUrl(String),
    OpenPath(PathBuf),
    Clipboard(String),
}

impl RecordingDesktop {
    pub fn events(&self) -> Vec<DesktopEvent> {
        self.events.lock().clone()
    }
}

impl Desktop for RecordingDesktop {
    fn open_url(&self, url: &str) -> Result<(), PaperlessError> {
        self.events.lock().push(DesktopEvent::OpenUrl(url.to_string()));
        Ok(())
    }

    fn open_path(&self, path: &Path) -> Result<(), PaperlessError> {
        self.events
            .lock()
            .push(DesktopEvent::OpenPath(path.to_path_buf()));
        Ok(())
    }

    fn set_clipboard_text(&self, text: &str) -> Result<(), PaperlessError> {
        self.events
            .lock()
            .push(DesktopEvent::Clipboard(text.to_string()));
        Ok(())
    }
}
