//! Errors returned by `paperless-search`
//!
use std::path::PathBuf;

use snafu::prelude::*;

use crate::lookups::RefCategory;

/// Errors returned by paperless-search crate
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PaperlessError {
    // Http connection or timeout error
    #[snafu(display("HTTP error {method} url:{url}"))]
    Http {
        method: String,
        url: String,
        source: reqwest::Error,
    },

    /// Paperless server responded with a non-success status.
    #[snafu(display("Api Server reported error ({code}) {method} {url}: {message}"))]
    ApiError {
        code: u16,
        method: String,
        url: String,
        message: String,
    },

    /// Deserialization error. The server response did not match the expected shape.
    #[snafu(display("Deserialization: {source}"))]
    Deserialization { source: serde_json::Error },

    /// Serialization error. unlikely to occur. If you see this error, please report it as a bug.
    #[snafu(display("Serialization: {source}"))]
    Serialization { source: serde_json::Error },

    /// Reading or writing a snapshot file or a downloaded document failed.
    #[snafu(display("file {path:?}: {source}"))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A reference id (tag, document type, correspondent) is not in the current lookup table.
    #[snafu(display("{category} {id} not found"))]
    NotFound { category: RefCategory, id: u64 },

    /// Settings are invalid or incomplete.
    #[snafu(display("Configuration error: {message}"))]
    Config { message: String },

    /// Some other error occurred
    #[snafu(display("{message}"))]
    Other { message: String },
}

impl PaperlessError {
    /// Returns true for errors caused by a request timing out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http { source, .. } if source.is_timeout())
    }

    /// Returns true if the server rejected our credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::ApiError { code: 401 | 403, .. })
    }
}
