//! Node entity: one content-bearing unit of a document tree

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque node identifier, stable for the node's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id, e.g. `node-3f2a...`.
    pub fn generate() -> Self {
        Self(format!("node-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A titled node with free-form content and ordered children.
///
/// `children_ids` order is document order. `parent_id` is `None` only for the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub children_ids: Vec<NodeId>,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
}

impl Node {
    /// Detached node whose content starts out equal to its title.
    pub fn new(id: NodeId, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id,
            content: title.clone(),
            title,
            children_ids: Vec::new(),
            parent_id: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.id)
    }
}
