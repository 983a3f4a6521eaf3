//! Domain layer: the document tree and everything computed from it
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod diff;
pub mod document;
pub mod editor;
pub mod error;
pub mod generation;
pub mod node;
pub mod projector;
pub mod store;
pub mod ui_state;

pub use diff::{line_diff, LineChange};
pub use document::{
    now_millis, Document, DocumentId, PersistedDocument, DEFAULT_DOCUMENT_NAME,
    UNTITLED_DOCUMENT_NAME,
};
pub use editor::{Deletion, Direction};
pub use error::{DomainError, DomainResult};
pub use generation::{BackendError, ChatMessage, GenerationRequest, NodeDraft, Role, Suggestion};
pub use node::{Node, NodeId};
pub use projector::PreviewBlock;
pub use store::{NodeStore, Violation};
pub use ui_state::{UiState, View};
