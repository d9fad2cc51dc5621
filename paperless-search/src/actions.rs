//! Actions attached to result items, and the desktop side effects they need.
//!
//! The library decides what an action does. Opening urls and files and
//! writing the clipboard are done by the host through [`Desktop`].

use std::path::{Path, PathBuf};

use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    Result,
    documents::{download_url, preview_url},
};

/// Desktop side effects, implemented by the host.
pub trait Desktop: Send + Sync {
    /// Opens a url in the default browser.
    fn open_url(&self, url: &str) -> Result<()>;

    /// Opens a local file with the default handler for its type.
    fn open_path(&self, path: &Path) -> Result<()>;

    fn set_clipboard_text(&self, text: &str) -> Result<()>;
}

/// Action ids, as shown to the host.
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
)]
pub enum ActionKind {
    /// Download the original file and open it
    #[strum(serialize = "download")]
    #[serde(rename = "download")]
    Download,
    /// Open the preview in the browser
    #[strum(serialize = "open")]
    #[serde(rename = "open")]
    Open,
    /// Copy the preview url
    #[strum(serialize = "copy")]
    #[serde(rename = "copy")]
    CopyPreviewUrl,
    /// Copy the download url
    #[strum(serialize = "copy-dl")]
    #[serde(rename = "copy-dl")]
    CopyDownloadUrl,
    /// Run a refresh cycle now
    #[strum(serialize = "refresh")]
    #[serde(rename = "refresh")]
    Refresh,
}

impl ActionKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Download => "Download document",
            Self::Open => "Open document in browser",
            Self::CopyPreviewUrl => "Copy preview URL to clipboard",
            Self::CopyDownloadUrl => "Copy download URL to clipboard",
            Self::Refresh => "Refresh document cache",
        }
    }
}

/// An action of a result item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Action {
    pub id: ActionKind,
    pub label: &'static str,
    /// Document the action applies to. None for [`ActionKind::Refresh`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<u64>,
    /// Url opened or copied by the action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Action {
    /// The four actions of a document result, in display order.
    pub fn for_document(base_url: &str, id: u64) -> Vec<Action> {
        let preview = preview_url(base_url, id);
        let download = download_url(base_url, id);
        vec![
            Self::document(ActionKind::Download, id, download.clone()),
            Self::document(ActionKind::Open, id, preview.clone()),
            Self::document(ActionKind::CopyPreviewUrl, id, preview),
            Self::document(ActionKind::CopyDownloadUrl, id, download),
        ]
    }

    pub fn refresh() -> Action {
        Action {
            id: ActionKind::Refresh,
            label: ActionKind::Refresh.label(),
            document_id: None,
            url: None,
        }
    }

    fn document(id: ActionKind, document_id: u64, url: String) -> Action {
        Action {
            id,
            label: id.label(),
            document_id: Some(document_id),
            url: Some(url),
        }
    }
}

/// What running an action did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    Downloaded { path: PathBuf },
    Opened { url: String },
    Copied { text: String },
    Refreshed { generation: u64, documents: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_actions() {
        let actions = Action::for_document("http://p:8000", 3);
        let ids: Vec<&str> = actions.iter().map(|a| a.id.into()).collect();
        assert_eq!(ids, vec!["download", "open", "copy", "copy-dl"]);
        assert_eq!(
            actions[1].url.as_deref(),
            Some("http://p:8000/api/documents/3/preview/")
        );
        assert_eq!(
            actions[3].url.as_deref(),
            Some("http://p:8000/api/documents/3/download/")
        );
        assert_eq!(actions[3].label, "Copy download URL to clipboard");
        assert!(actions.iter().all(|a| a.document_id == Some(3)));
    }

    #[test]
    fn test_action_ids_parse() {
        assert_eq!(
            "copy-dl".parse::<ActionKind>().expect("parse"),
            ActionKind::CopyDownloadUrl
        );
        assert!("delete".parse::<ActionKind>().is_err());
        let json = serde_json::to_value(Action::refresh()).expect("json");
        assert_eq!(json["id"], "refresh");
        assert!(json.get("url").is_none());
    }
}
