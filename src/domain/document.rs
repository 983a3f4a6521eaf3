//! Document: a named tree plus identity and modification metadata

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::editor;
use crate::domain::{DomainResult, Node, NodeId, NodeStore};

/// Name used when a document has to be synthesized from nothing.
pub const DEFAULT_DOCUMENT_NAME: &str = "My First Document";
/// Name given to documents created on demand.
pub const UNTITLED_DOCUMENT_NAME: &str = "Untitled Document";

/// Opaque document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("doc-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A complete document tree with its identity.
///
/// `name` mirrors the root title: renaming the root through
/// [`Document::rename_node`] keeps both in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub store: NodeStore,
    pub last_modified: i64,
}

impl Document {
    /// Empty document: a single root whose title and content equal `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let root = Node::new(NodeId::generate(), name.clone());
        Self {
            id: DocumentId::generate(),
            name,
            store: NodeStore::new(root),
            last_modified: now_millis(),
        }
    }

    /// Starter document used when nothing could be loaded.
    pub fn seed() -> Self {
        let root_id = NodeId::from("root");
        let root = Node::new(root_id.clone(), "My Document");
        let store = editor::create_node(
            &NodeStore::new(root),
            &root_id,
            Node::new(NodeId::from("child1"), "Chapter 1"),
        );
        Self {
            id: DocumentId::generate(),
            name: DEFAULT_DOCUMENT_NAME.to_string(),
            store,
            last_modified: now_millis(),
        }
    }

    pub fn root_id(&self) -> &NodeId {
        self.store.root_id()
    }

    /// Record a new snapshot as the current revision.
    pub fn commit(&mut self, store: NodeStore) {
        self.store = store;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_modified = now_millis();
    }

    /// Rename a node; renaming the root also renames the document.
    pub fn rename_node(&mut self, node_id: &NodeId, title: &str) -> DomainResult<()> {
        let next = editor::rename(&self.store, node_id, title)?;
        if node_id == self.root_id() {
            self.name = title.to_string();
        }
        self.commit(next);
        Ok(())
    }

    pub fn to_persisted(&self) -> PersistedDocument {
        PersistedDocument {
            id: self.id.clone(),
            name: self.name.clone(),
            root_id: self.root_id().clone(),
            last_modified: self.last_modified,
            nodes: self.store.to_pairs(),
        }
    }
}

/// On-disk / export form of a document: nodes as an ordered list of `[id, node]` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDocument {
    pub id: DocumentId,
    pub name: String,
    pub root_id: NodeId,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(alias = "docMap")]
    pub nodes: Vec<(NodeId, Node)>,
}

impl From<PersistedDocument> for Document {
    fn from(p: PersistedDocument) -> Self {
        Self {
            id: p.id,
            name: p.name,
            store: store_from_pairs(p.root_id, p.nodes),
            last_modified: p.last_modified,
        }
    }
}

/// Build a store from `[id, node]` pairs. The pair key wins over the node's own id.
pub fn store_from_pairs(root_id: NodeId, pairs: Vec<(NodeId, Node)>) -> NodeStore {
    let nodes = pairs.into_iter().map(|(key, mut node)| {
        if node.id != key {
            warn!("node stored under {} carries id {}, using key", key, node.id);
            node.id = key;
        }
        node
    });
    NodeStore::from_nodes(root_id, nodes)
}
