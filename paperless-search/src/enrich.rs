//! # Document enrichment
//!
//! Turns raw document pages into [`IndexedDocument`]s: reference ids are
//! replaced by names using the cycle's [`Resolver`], and the lowercase filter
//! string is derived from the enriched fields. Both happen exactly once per
//! document per refresh cycle.
//!
//! Names are resolved for every category, so subtitles stay complete. The
//! [`FilterToggles`] only decide which fields go into the filter string, and
//! whether the body is kept at all.

use std::sync::Arc;

use futures::{StreamExt, stream::BoxStream};

use crate::{
    documents::{Document, EnrichedDocument, IndexedDocument},
    lookups::Resolver,
    paged::{PageStream, into_items},
    settings::FilterToggles,
};

/// Lazily enriches every document of a page stream.
/// The stream ends where the page stream ends, including on a fetch failure.
pub fn enrich(
    pages: PageStream<Document>,
    resolver: Arc<Resolver>,
    toggles: FilterToggles,
) -> BoxStream<'static, IndexedDocument> {
    into_items(pages)
        .map(move |doc| enrich_document(doc, &resolver, &toggles))
        .boxed()
}

/// Resolves the references of one document and builds its filter string.
/// An absent reference, or one that cannot be resolved, leaves the name empty
/// without dropping the document.
pub fn enrich_document(
    doc: Document,
    resolver: &Resolver,
    toggles: &FilterToggles,
) -> IndexedDocument {
    let document = EnrichedDocument {
        id: doc.id,
        document_type: resolver.resolve_document_type(doc.document_type),
        correspondent: resolver.resolve_correspondent(doc.correspondent),
        tags: resolver.resolve_tags(&doc.tags),
        body: if toggles.body { doc.content } else { None },
        title: doc.title,
    };
    let filter = filter_string(&document, toggles);
    IndexedDocument { document, filter }
}

/// Lowercase title followed by every enabled, non-empty field, separated by spaces.
pub fn filter_string(doc: &EnrichedDocument, toggles: &FilterToggles) -> String {
    let fields = [
        (toggles.tags, doc.tags.as_deref()),
        (toggles.document_type, doc.document_type.as_deref()),
        (toggles.correspondent, doc.correspondent.as_deref()),
        (toggles.body, doc.body.as_deref()),
    ];
    let mut filter = doc.title.to_lowercase();
    for value in fields
        .iter()
        .filter_map(|(enabled, value)| enabled.then_some(*value).flatten())
        .filter(|value| !value.is_empty())
    {
        filter.push(' ');
        filter.push_str(&value.to_lowercase());
    }
    filter
}
