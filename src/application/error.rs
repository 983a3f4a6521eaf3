//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{BackendError, DocumentId, DomainError};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("invalid document payload: {0}")]
    Validation(String),

    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("no active document")]
    NoActiveDocument,

    #[error("proposed edit is stale: {0}")]
    StaleProposal(String),

    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
