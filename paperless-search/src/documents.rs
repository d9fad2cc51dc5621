//! Paperless documents, before and after enrichment.

use serde::{Deserialize, Serialize};

/// A document as returned by `GET /api/documents/`.
/// Only the fields used for search and display are kept.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Document {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub document_type: Option<u64>,
    #[serde(default)]
    pub correspondent: Option<u64>,
    #[serde(default)]
    pub tags: Vec<u64>,
    /// OCR text of the document
    #[serde(default, alias = "body")]
    pub content: Option<String>,
}

/// A document with its references replaced by display names.
///
/// A name is None when the document has no reference in that category,
/// the reference could not be resolved, or the category is not searched.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct EnrichedDocument {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub correspondent: Option<String>,
    /// Comma-joined tag names
    #[serde(default)]
    pub tags: Option<String>,
    /// Kept only when searching by body is enabled
    #[serde(default)]
    pub body: Option<String>,
}

impl EnrichedDocument {
    /// Subtitle shown under the title: `type - correspondent - tags`.
    pub fn subtitle(&self) -> String {
        [
            self.document_type.as_deref().unwrap_or("No type"),
            self.correspondent.as_deref().unwrap_or("No Correspondent"),
            self.tags.as_deref().unwrap_or("No tags"),
        ]
        .join(" - ")
    }
}

/// An enriched document together with its lowercase filter string.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct IndexedDocument {
    #[serde(flatten)]
    pub document: EnrichedDocument,
    pub filter: String,
}

impl IndexedDocument {
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.filter.contains(needle)
    }
}

/// Url of the rendered preview of a document.
pub fn preview_url(base_url: &str, id: u64) -> String {
    format!("{}/api/documents/{id}/preview/", base_url.trim_end_matches('/'))
}

/// Url of the original file of a document.
pub fn download_url(base_url: &str, id: u64) -> String {
    format!("{}/api/documents/{id}/download/", base_url.trim_end_matches('/'))
}
