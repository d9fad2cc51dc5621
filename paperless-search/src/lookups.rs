//! # Reference lookups
//!
//! Documents refer to tags, document types and correspondents by integer id.
//! Each category is fetched once per refresh cycle into a [`LookupTable`], and
//! the [`Resolver`] maps ids to display names for every document in that cycle.
//! All three categories are always resolved, since result subtitles show them
//! whether or not they are searchable.
//!
//! Tables are held in memory only. They are rebuilt from scratch on every
//! refresh, never updated in place, so there is no staleness to track.
//!
//! Lookup is a linear scan. Tables are small (tens to a few hundred entries)
//! and this keeps resolution order-preserving and allocation free.

use futures::future;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::{debug, warn};

use crate::{Result, client::PaperlessClient, error::PaperlessError};

/// The reference categories that can be resolved to names.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RefCategory {
    Tag,
    DocumentType,
    Correspondent,
}

impl RefCategory {
    /// Api path of the list endpoint for this category.
    pub fn path(self) -> &'static str {
        match self {
            Self::Tag => "/api/tags/",
            Self::DocumentType => "/api/document_types/",
            Self::Correspondent => "/api/correspondents/",
        }
    }
}

/// A `{id, name}` pair from one of the lookup endpoints.
/// The endpoints return more fields (slug, colour, match rules); only these two are kept.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Reference {
    pub id: u64,
    pub name: String,
}

/// All references of one category, as fetched in one refresh cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupTable {
    category: RefCategory,
    entries: Vec<Reference>,
}

impl LookupTable {
    pub fn new(category: RefCategory, entries: Vec<Reference>) -> Self {
        Self { category, entries }
    }

    pub fn category(&self) -> RefCategory {
        self.category
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the name for `id`, or `NotFound` if the id is not in the table.
    pub fn resolve(&self, id: u64) -> Result<&str> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.name.as_str())
            .ok_or(PaperlessError::NotFound {
                category: self.category,
                id,
            })
    }
}

/// Resolves reference ids to names using the lookup tables of one refresh cycle.
///
/// A category without a table resolves every id to None.
#[derive(Clone, Debug, Default)]
pub struct Resolver {
    tags: Option<LookupTable>,
    document_types: Option<LookupTable>,
    correspondents: Option<LookupTable>,
}

impl Resolver {
    /// Builds a resolver from already-fetched tables.
    pub fn new(
        tags: Option<LookupTable>,
        document_types: Option<LookupTable>,
        correspondents: Option<LookupTable>,
    ) -> Self {
        Self {
            tags,
            document_types,
            correspondents,
        }
    }

    /// Fetches the lookup table of every category. The fetches run concurrently.
    pub async fn fetch(client: &PaperlessClient) -> Self {
        let (tags, document_types, correspondents) = future::join3(
            fetch_table(client, RefCategory::Tag),
            fetch_table(client, RefCategory::DocumentType),
            fetch_table(client, RefCategory::Correspondent),
        )
        .await;
        Self {
            tags: Some(tags),
            document_types: Some(document_types),
            correspondents: Some(correspondents),
        }
    }

    pub fn table(&self, category: RefCategory) -> Option<&LookupTable> {
        match category {
            RefCategory::Tag => self.tags.as_ref(),
            RefCategory::DocumentType => self.document_types.as_ref(),
            RefCategory::Correspondent => self.correspondents.as_ref(),
        }
    }

    /// Resolves a single id. Returns None if the category has no table.
    pub fn resolve_single(&self, category: RefCategory, id: u64) -> Option<Result<&str>> {
        self.table(category).map(|table| table.resolve(id))
    }

    /// Resolves a list of tag ids to a comma-joined list of names.
    /// Unknown ids are logged and rendered as `<tag-{id}>`.
    /// Returns None if there is no tag table or the list is empty.
    pub fn resolve_tags(&self, ids: &[u64]) -> Option<String> {
        let table = self.tags.as_ref()?;
        if ids.is_empty() {
            return None;
        }
        let names: Vec<String> = ids
            .iter()
            .map(|id| match table.resolve(*id) {
                Ok(name) => name.to_string(),
                Err(e) => {
                    warn!(id, "Error parsing tag {id}: {e}");
                    format!("<tag-{id}>")
                }
            })
            .collect();
        Some(names.join(","))
    }

    /// Resolves a document type id. Unknown ids are logged and resolve to None.
    pub fn resolve_document_type(&self, id: Option<u64>) -> Option<String> {
        self.resolve_optional(RefCategory::DocumentType, id)
    }

    /// Resolves a correspondent id. Unknown ids are logged and resolve to None.
    pub fn resolve_correspondent(&self, id: Option<u64>) -> Option<String> {
        self.resolve_optional(RefCategory::Correspondent, id)
    }

    fn resolve_optional(&self, category: RefCategory, id: Option<u64>) -> Option<String> {
        match self.resolve_single(category, id?)? {
            Ok(name) => Some(name.to_string()),
            Err(e) => {
                warn!(%category, "dangling reference: {e}");
                None
            }
        }
    }
}

async fn fetch_table(client: &PaperlessClient, category: RefCategory) -> LookupTable {
    let table = client.lookup_table(category).await;
    debug!(%category, entries = table.len(), "lookup table");
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(category: RefCategory, pairs: &[(u64, &str)]) -> LookupTable {
        LookupTable::new(
            category,
            pairs
                .iter()
                .map(|(id, name)| Reference {
                    id: *id,
                    name: (*name).to_string(),
                })
                .collect(),
        )
    }

    fn resolver() -> Resolver {
        Resolver::new(
            Some(table(RefCategory::Tag, &[(5, "Finance"), (7, "Home")])),
            Some(table(RefCategory::DocumentType, &[(2, "Bill")])),
            Some(table(RefCategory::Correspondent, &[(9, "ACME")])),
        )
    }

    #[test]
    fn test_resolve_found_and_missing() {
        let tags = table(RefCategory::Tag, &[(5, "Finance")]);
        assert_eq!(tags.resolve(5).expect("found"), "Finance");
        let err = tags.resolve(6).expect_err("missing");
        assert!(matches!(
            err,
            PaperlessError::NotFound {
                category: RefCategory::Tag,
                id: 6
            }
        ));
        assert_eq!(err.to_string(), "tag 6 not found");
    }

    #[test]
    fn test_resolve_tags_joins_names_and_placeholders() {
        let r = resolver();
        assert_eq!(r.resolve_tags(&[5, 7]).as_deref(), Some("Finance,Home"));
        assert_eq!(
            r.resolve_tags(&[7, 42, 5]).as_deref(),
            Some("Home,<tag-42>,Finance")
        );
        assert_eq!(r.resolve_tags(&[]), None);
    }

    #[test]
    fn test_dangling_type_and_correspondent_resolve_to_none() {
        let r = resolver();
        assert_eq!(r.resolve_document_type(Some(2)).as_deref(), Some("Bill"));
        assert_eq!(r.resolve_document_type(Some(3)), None);
        assert_eq!(r.resolve_document_type(None), None);
        assert_eq!(r.resolve_correspondent(Some(9)).as_deref(), Some("ACME"));
        assert_eq!(r.resolve_correspondent(Some(1)), None);
    }

    #[test]
    fn test_missing_table_resolves_nothing() {
        let r = Resolver::new(None, None, None);
        assert_eq!(r.resolve_tags(&[5]), None);
        assert!(r.resolve_single(RefCategory::DocumentType, 2).is_none());
        assert_eq!(r.resolve_correspondent(Some(9)), None);
    }

    #[test]
    fn test_category_names_and_paths() {
        assert_eq!(RefCategory::DocumentType.to_string(), "document_type");
        assert_eq!(RefCategory::Tag.path(), "/api/tags/");
        assert_eq!(
            "correspondent".parse::<RefCategory>().expect("parse"),
            RefCategory::Correspondent
        );
    }
}
