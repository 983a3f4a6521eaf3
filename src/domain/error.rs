//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::NodeId;

/// Domain errors represent structural violations of the document tree.
/// A rejected operation never modifies the snapshot it was given.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("cannot delete root node: {0}")]
    RootDeletion(NodeId),

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("parent node not found: {0}")]
    ParentNotFound(NodeId),

    #[error("invalid tree: {0}")]
    InvalidTree(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
