//! Document collection plus the session state that points into it
//!
//! The registry owns every open [`Document`] and the [`UiState`]. All tree
//! edits of the active document go through [`DocumentRegistry::update_active`],
//! so each one runs against the latest snapshot.

use std::collections::HashSet;

use tracing::{debug, instrument, warn};

use crate::application::migrator;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::editor;
use crate::domain::{
    now_millis, Direction, Document, DocumentId, DomainError, DomainResult, Node, NodeId,
    NodeStore, UiState, View,
};
use crate::util::path::title_from_file_name;

/// Outcome of removing a node from the active document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedSubtree {
    pub removed: HashSet<NodeId>,
    pub former_parent: NodeId,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentRegistry {
    documents: Vec<Document>,
    ui: UiState,
}

impl DocumentRegistry {
    /// Build a registry and make sure the UI state points at something real.
    pub fn new(documents: Vec<Document>, ui: UiState) -> Self {
        let mut registry = Self { documents, ui };
        registry.repair_ui();
        registry
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Documents ordered most recently modified first.
    pub fn documents_by_recency(&self) -> Vec<&Document> {
        let mut docs: Vec<&Document> = self.documents.iter().collect();
        docs.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        docs
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| &d.id == id)
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn active(&self) -> Option<&Document> {
        self.ui.active_document_id.as_ref().and_then(|id| self.get(id))
    }

    pub fn active_or_err(&self) -> ApplicationResult<&Document> {
        self.active().ok_or(ApplicationError::NoActiveDocument)
    }

    /// Focused node of the active document, falling back to its root.
    pub fn focused_node_id(&self) -> Option<&NodeId> {
        self.active().map(|doc| self.ui.focus_in(&doc.store))
    }

    fn most_recent(&self) -> Option<&Document> {
        self.documents.iter().max_by_key(|d| d.last_modified)
    }

    fn position(&self, id: &DocumentId) -> Option<usize> {
        self.documents.iter().position(|d| &d.id == id)
    }

    /// Make `id` the active document, or the most recently modified one if
    /// `id` does not resolve. Resets focus, expansion and view.
    #[instrument(level = "debug", skip(self))]
    pub fn select_active(&mut self, id: &DocumentId) -> Option<DocumentId> {
        let target = match self.get(id) {
            Some(doc) => Some(doc),
            None => {
                debug!("select_active: {} not found, falling back to most recent", id);
                self.most_recent()
            }
        };
        match target.map(|doc| (doc.id.clone(), doc.root_id().clone())) {
            Some((doc_id, root_id)) => {
                self.ui = UiState::for_document(doc_id.clone(), &root_id);
                Some(doc_id)
            }
            None => {
                self.ui.clear();
                None
            }
        }
    }

    /// Ensure the active document and focus resolve.
    ///
    /// An unresolvable active document is replaced by the most recently
    /// modified one; a dangling focus is moved to the root.
    pub fn repair_ui(&mut self) {
        let Some(active_id) = self.ui.active_document_id.clone() else {
            if let Some(id) = self.most_recent().map(|d| d.id.clone()) {
                self.select_active(&id);
            }
            return;
        };
        let Some(doc) = self.get(&active_id) else {
            warn!("active document {} not found, selecting most recent", active_id);
            self.select_active(&active_id);
            return;
        };
        let dangling_focus = self
            .ui
            .focused_node_id
            .as_ref()
            .filter(|focus| !doc.store.contains(focus))
            .map(|focus| (focus.clone(), doc.root_id().clone()));
        if let Some((focus, root_id)) = dangling_focus {
            warn!("focused node {} not found, resetting to root", focus);
            self.ui.focused_node_id = Some(root_id);
        }
    }

    /// New document with a single root titled `name`; becomes active.
    pub fn create_document(&mut self, name: impl Into<String>) -> DocumentId {
        self.insert_document(Document::new(name))
    }

    /// Add `doc`, replacing any document with the same id, and make it active.
    pub fn insert_document(&mut self, doc: Document) -> DocumentId {
        let id = doc.id.clone();
        match self.position(&id) {
            Some(pos) => {
                debug!("insert_document: replacing {}", id);
                self.documents[pos] = doc;
            }
            None => self.documents.push(doc),
        }
        self.select_active(&id);
        id
    }

    /// Remove a document. Returns the newly active document, if any remains.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_document(&mut self, id: &DocumentId) -> ApplicationResult<Option<DocumentId>> {
        let pos = self
            .position(id)
            .ok_or_else(|| ApplicationError::DocumentNotFound(id.clone()))?;
        self.documents.remove(pos);

        if self.ui.active_document_id.as_ref() == Some(id) {
            return Ok(self.select_active(id));
        }
        Ok(self.ui.active_document_id.clone())
    }

    /// Validate and add a serialized document. On failure nothing changes.
    #[instrument(level = "debug", skip(self, raw), fields(len = raw.len()))]
    pub fn import_document(&mut self, raw: &[u8]) -> ApplicationResult<DocumentId> {
        let mut doc = migrator::parse_document_payload(raw)?;
        doc.last_modified = now_millis();
        Ok(self.insert_document(doc))
    }

    /// Run `edit` against the active document's current snapshot and commit
    /// the result. An unchanged snapshot is not committed.
    pub fn update_active<F>(&mut self, edit: F) -> ApplicationResult<()>
    where
        F: FnOnce(&NodeStore) -> DomainResult<NodeStore>,
    {
        self.with_active_mut(|doc| {
            let next = edit(&doc.store)?;
            if next != doc.store {
                doc.commit(next);
            }
            Ok(())
        })
    }

    /// Give `f` mutable access to the active document.
    pub fn with_active_mut<F, T>(&mut self, f: F) -> ApplicationResult<T>
    where
        F: FnOnce(&mut Document) -> DomainResult<T>,
    {
        let id = self
            .ui
            .active_document_id
            .clone()
            .ok_or(ApplicationError::NoActiveDocument)?;
        if self.position(&id).is_none() {
            return Err(ApplicationError::NoActiveDocument);
        }
        self.with_document_mut(&id, f)
    }

    /// Give `f` mutable access to the document `id`, active or not.
    pub fn with_document_mut<F, T>(&mut self, id: &DocumentId, f: F) -> ApplicationResult<T>
    where
        F: FnOnce(&mut Document) -> DomainResult<T>,
    {
        let pos = self
            .position(id)
            .ok_or_else(|| ApplicationError::DocumentNotFound(id.clone()))?;
        Ok(f(&mut self.documents[pos])?)
    }

    pub fn focus_node(&mut self, id: &NodeId) -> ApplicationResult<()> {
        let doc = self.active_or_err()?;
        if !doc.store.contains(id) {
            return Err(DomainError::NodeNotFound(id.clone()).into());
        }
        self.ui.focused_node_id = Some(id.clone());
        Ok(())
    }

    /// Flip expansion of `id`; returns whether it is now expanded.
    pub fn toggle_expansion(&mut self, id: &NodeId) -> ApplicationResult<bool> {
        let doc = self.active_or_err()?;
        if !doc.store.contains(id) {
            return Err(DomainError::NodeNotFound(id.clone()).into());
        }
        Ok(self.ui.toggle_expansion(id))
    }

    pub fn set_view(&mut self, view: View) {
        self.ui.active_view = view;
    }

    /// Attach `node` under `parent_id`, focus it and expand the parent.
    #[instrument(level = "debug", skip(self, node), fields(node_id = %node.id))]
    pub fn add_node(&mut self, parent_id: &NodeId, node: Node) -> ApplicationResult<NodeId> {
        let id = node.id.clone();
        self.update_active(|store| {
            if !store.contains(parent_id) {
                return Err(DomainError::ParentNotFound(parent_id.clone()));
            }
            if store.contains(&node.id) {
                return Err(DomainError::InvalidTree(format!("duplicate node id {}", node.id)));
            }
            Ok(editor::create_node(store, parent_id, node))
        })?;
        self.ui.focused_node_id = Some(id.clone());
        self.ui.expand(parent_id);
        Ok(id)
    }

    /// Delete `id` and its descendants. Focus inside the removed subtree moves
    /// to the former parent.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_node(&mut self, id: &NodeId) -> ApplicationResult<RemovedSubtree> {
        let outcome = self.with_active_mut(|doc| {
            let deletion = editor::delete_subtree(&doc.store, id)?;
            doc.commit(deletion.store);
            Ok(RemovedSubtree {
                removed: deletion.removed,
                former_parent: deletion.former_parent,
            })
        })?;

        let focus_removed = self
            .ui
            .focused_node_id
            .as_ref()
            .is_some_and(|f| outcome.removed.contains(f));
        if focus_removed {
            self.ui.focused_node_id = Some(outcome.former_parent.clone());
        }
        self.ui
            .expanded_node_ids
            .retain(|e| !outcome.removed.contains(e));
        Ok(outcome)
    }

    pub fn rename_node(&mut self, id: &NodeId, title: &str) -> ApplicationResult<()> {
        self.with_active_mut(|doc| doc.rename_node(id, title))
    }

    pub fn set_node_content(&mut self, id: &NodeId, content: &str) -> ApplicationResult<()> {
        self.update_active(|store| editor::set_content(store, id, content))
    }

    /// Move `id`; returns whether the tree changed. Illegal moves are no-ops.
    pub fn move_node(&mut self, id: &NodeId, direction: Direction) -> ApplicationResult<bool> {
        self.with_active_mut(|doc| {
            let next = editor::move_node(&doc.store, id, direction);
            if next == doc.store {
                return Ok(false);
            }
            doc.commit(next);
            Ok(true)
        })
    }

    /// Add one child of `parent_id` per `(file name, text)` pair.
    ///
    /// Titles are file names without their last extension. Nothing is added
    /// if the parent does not resolve.
    #[instrument(level = "debug", skip(self, files), fields(count = files.len()))]
    pub fn batch_import(
        &mut self,
        parent_id: &NodeId,
        files: Vec<(String, String)>,
    ) -> ApplicationResult<Vec<NodeId>> {
        let nodes: Vec<Node> = files
            .into_iter()
            .map(|(name, text)| {
                Node::new(NodeId::generate(), title_from_file_name(&name)).with_content(text)
            })
            .collect();
        let added: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();

        self.update_active(|store| {
            if !store.contains(parent_id) {
                return Err(DomainError::ParentNotFound(parent_id.clone()));
            }
            Ok(nodes
                .into_iter()
                .fold(store.clone(), |next, node| editor::create_node(&next, parent_id, node)))
        })?;
        if !added.is_empty() {
            self.ui.expand(parent_id);
        }
        Ok(added)
    }
}
