//! Launcher queries and the items returned for them.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde::Serialize;

use crate::{actions::Action, documents::EnrichedDocument};

/// Name shown on the prompt item.
pub const PLUGIN_NAME: &str = "Paperless";

/// Trigger typed in the launcher before a query, e.g. `pl invoice`.
pub const DEFAULT_TRIGGER: &str = "pl ";

/// A query from the launcher.
pub trait LauncherQuery: Send + Sync {
    /// The text typed after the trigger.
    fn text(&self) -> &str;

    /// False once the user has typed on, and results for this text are no longer wanted.
    fn is_valid(&self) -> bool;
}

/// A query with fixed text. It stays valid until [`TextQuery::cancel`] is
/// called on it or on one of its clones.
#[derive(Clone, Debug)]
pub struct TextQuery {
    text: String,
    valid: Arc<AtomicBool>,
}

impl TextQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            valid: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn cancel(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }
}

impl LauncherQuery for TextQuery {
    fn text(&self) -> &str {
        &self.text
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }
}

/// One row of launcher results.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultItem {
    pub id: String,
    pub text: String,
    pub subtext: String,
    pub actions: Vec<Action>,
}

impl ResultItem {
    /// Static item shown for an empty query.
    pub fn prompt() -> Self {
        Self {
            id: "paperless".to_string(),
            text: PLUGIN_NAME.to_string(),
            subtext: "Search for a document in Paperless".to_string(),
            actions: Vec::new(),
        }
    }

    /// Item that refreshes the document cache.
    pub fn refresh() -> Self {
        Self {
            id: "paperless-refresh".to_string(),
            text: "Refresh cache".to_string(),
            subtext: "Refresh cached documents".to_string(),
            actions: vec![Action::refresh()],
        }
    }

    pub fn for_document(base_url: &str, doc: &EnrichedDocument) -> Self {
        Self {
            id: format!("paperless-{}", doc.id),
            text: doc.title.clone(),
            subtext: doc.subtitle(),
            actions: Action::for_document(base_url, doc.id),
        }
    }

    pub fn action(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|action| <&str>::from(action.id) == id)
    }
}

/// A result of a global (untriggered) query, with its rank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankItem {
    pub item: ResultItem,
    pub score: u32,
}
