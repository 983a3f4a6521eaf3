//! Backend-assisted rewriting and node creation
//!
//! Proposals are computed against a snapshot and applied later. Applying
//! re-resolves the document and node ids, so a proposal whose target vanished
//! in the meantime is rejected instead of resurrecting it.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::registry::DocumentRegistry;
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::BackendConfig;
use crate::domain::editor;
use crate::domain::generation::{self, NodeDraft, Suggestion};
use crate::domain::{projector, Document, DocumentId, DomainError, Node, NodeId};
use crate::infrastructure::traits::GenerationBackend;

/// Suggested replacement content for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedEdit {
    pub document_id: DocumentId,
    pub node_id: NodeId,
    /// Content the suggestion was computed from.
    pub base_content: String,
    pub suggestion: Suggestion,
}

/// Suggested new child node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedNode {
    pub document_id: DocumentId,
    pub parent_id: NodeId,
    pub draft: NodeDraft,
}

pub struct GenerationService {
    backend: Arc<dyn GenerationBackend>,
    config: BackendConfig,
}

impl GenerationService {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: BackendConfig) -> Self {
        Self { backend, config }
    }

    /// Ask the backend to rewrite `node_id` according to `prompt`.
    ///
    /// The document outline is sent along as context.
    #[instrument(level = "debug", skip(self, doc, prompt), fields(doc = %doc.id))]
    pub fn propose_rewrite(
        &self,
        doc: &Document,
        node_id: &NodeId,
        prompt: &str,
    ) -> ApplicationResult<ProposedEdit> {
        let node = doc
            .store
            .get(node_id)
            .ok_or_else(|| DomainError::NodeNotFound(node_id.clone()))?;
        let request = generation::rewrite_request(
            &self.config.model,
            &self.config.system_prompt,
            node_id,
            &node.content,
            prompt,
            &projector::outline(&doc.store),
        );

        let raw = self.backend.complete(&request)?;
        debug!("propose_rewrite: {} bytes from backend", raw.len());

        Ok(ProposedEdit {
            document_id: doc.id.clone(),
            node_id: node_id.clone(),
            base_content: node.content.clone(),
            suggestion: generation::parse_suggestion(&raw),
        })
    }

    /// Ask the backend for a title and content of a new child of `parent_id`.
    #[instrument(level = "debug", skip(self, doc, intent), fields(doc = %doc.id))]
    pub fn propose_child(
        &self,
        doc: &Document,
        parent_id: &NodeId,
        intent: &str,
    ) -> ApplicationResult<ProposedNode> {
        if !doc.store.contains(parent_id) {
            return Err(DomainError::ParentNotFound(parent_id.clone()).into());
        }
        let request = generation::child_request(&self.config.model, parent_id, intent);
        let raw = self.backend.complete(&request)?;

        Ok(ProposedNode {
            document_id: doc.id.clone(),
            parent_id: parent_id.clone(),
            draft: generation::parse_node_draft(&raw),
        })
    }

    /// Replace the target node's content with the suggestion.
    #[instrument(level = "debug", skip(self, registry, edit), fields(node = %edit.node_id))]
    pub fn accept(&self, registry: &mut DocumentRegistry, edit: &ProposedEdit) -> ApplicationResult<()> {
        let doc = registry.get(&edit.document_id).ok_or_else(|| {
            ApplicationError::StaleProposal(format!("document {} no longer exists", edit.document_id))
        })?;
        let current = doc.store.get(&edit.node_id).ok_or_else(|| {
            ApplicationError::StaleProposal(format!("node {} no longer exists", edit.node_id))
        })?;
        if current.content != edit.base_content {
            info!("node {} changed since the suggestion was made", edit.node_id);
        }

        let text = edit.suggestion.text.as_str();
        registry.with_document_mut(&edit.document_id, |doc| {
            let next = editor::set_content(&doc.store, &edit.node_id, text)?;
            doc.commit(next);
            Ok(())
        })
    }

    /// Attach the proposed node. Focuses it when its document is active.
    pub fn accept_child(
        &self,
        registry: &mut DocumentRegistry,
        proposal: &ProposedNode,
    ) -> ApplicationResult<NodeId> {
        let doc = registry.get(&proposal.document_id).ok_or_else(|| {
            ApplicationError::StaleProposal(format!(
                "document {} no longer exists",
                proposal.document_id
            ))
        })?;
        if !doc.store.contains(&proposal.parent_id) {
            return Err(ApplicationError::StaleProposal(format!(
                "parent {} no longer exists",
                proposal.parent_id
            )));
        }

        let node = Node::new(NodeId::generate(), proposal.draft.title.clone())
            .with_content(proposal.draft.content.clone());
        let is_active = registry.ui().active_document_id.as_ref() == Some(&proposal.document_id);
        if is_active {
            return registry.add_node(&proposal.parent_id, node);
        }

        let id = node.id.clone();
        registry.with_document_mut(&proposal.document_id, |doc| {
            let next = editor::create_node(&doc.store, &proposal.parent_id, node);
            doc.commit(next);
            Ok(())
        })?;
        Ok(id)
    }
}
