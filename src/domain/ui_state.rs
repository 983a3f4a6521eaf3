//! Session state: active document, focus, expansion, and active view

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{DocumentId, NodeId, NodeStore};

/// Which panel the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Outline,
    Editor,
    Preview,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            View::Outline => "outline",
            View::Editor => "editor",
            View::Preview => "preview",
        };
        f.write_str(s)
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "outline" => Ok(View::Outline),
            "editor" => Ok(View::Editor),
            "preview" => Ok(View::Preview),
            other => Err(format!("unknown view: {other}")),
        }
    }
}

/// UI state persisted next to the document collection.
///
/// Ids held here may outlive the nodes they point at. Readers go through
/// [`UiState::focus_in`] which falls back to the root.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiState {
    pub active_document_id: Option<DocumentId>,
    pub focused_node_id: Option<NodeId>,
    pub expanded_node_ids: Vec<NodeId>,
    #[serde(alias = "activeTab", deserialize_with = "lenient_view")]
    pub active_view: View,
}

impl UiState {
    /// State focused on the root of the given document.
    pub fn for_document(id: DocumentId, root_id: &NodeId) -> Self {
        Self {
            active_document_id: Some(id),
            focused_node_id: Some(root_id.clone()),
            expanded_node_ids: vec![root_id.clone()],
            active_view: View::Outline,
        }
    }

    /// Focused node resolved against `store`, falling back to the root.
    pub fn focus_in<'a>(&'a self, store: &'a NodeStore) -> &'a NodeId {
        store.resolve_or_root(self.focused_node_id.as_ref())
    }

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.expanded_node_ids.contains(id)
    }

    pub fn expand(&mut self, id: &NodeId) {
        if !self.is_expanded(id) {
            self.expanded_node_ids.push(id.clone());
        }
    }

    /// Flip expansion of `id`; returns the new state.
    pub fn toggle_expansion(&mut self, id: &NodeId) -> bool {
        if self.is_expanded(id) {
            self.expanded_node_ids.retain(|e| e != id);
            false
        } else {
            self.expanded_node_ids.push(id.clone());
            true
        }
    }

    /// Reset focus/expansion to nothing; used when no document is active.
    pub fn clear(&mut self) {
        self.active_document_id = None;
        self.focused_node_id = None;
        self.expanded_node_ids.clear();
    }
}

fn lenient_view<'de, D>(deserializer: D) -> Result<View, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_toggle_twice_then_expansion_restored() {
        let mut ui = UiState::default();
        let id = NodeId::from("a");
        assert!(ui.toggle_expansion(&id));
        assert!(!ui.toggle_expansion(&id));
        assert!(ui.expanded_node_ids.is_empty());
    }

    #[test]
    fn given_legacy_active_tab_then_maps_to_view() {
        let ui: UiState =
            serde_json::from_str(r#"{"activeDocumentId":"d","activeTab":"preview"}"#).unwrap();
        assert_eq!(ui.active_view, View::Preview);
        let ui: UiState = serde_json::from_str(r#"{"activeTab":"settings"}"#).unwrap();
        assert_eq!(ui.active_view, View::Outline);
    }
}
