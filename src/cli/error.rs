//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::BackendError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => crate::exitcode::IOERR,
                InfraError::Editor { .. } => crate::exitcode::SOFTWARE,
                InfraError::Application(app) => application_exit_code(app),
            },
        }
    }
}

fn application_exit_code(e: &ApplicationError) -> i32 {
    match e {
        ApplicationError::Domain(_)
        | ApplicationError::Validation(_)
        | ApplicationError::StaleProposal(_) => crate::exitcode::DATAERR,
        ApplicationError::DocumentNotFound(_) | ApplicationError::NoActiveDocument => {
            crate::exitcode::NOINPUT
        }
        ApplicationError::Backend(BackendError::NotConfigured | BackendError::InvalidUrl { .. })
        | ApplicationError::Config { .. } => crate::exitcode::CONFIG,
        ApplicationError::Backend(_) => crate::exitcode::UNAVAILABLE,
        ApplicationError::OperationFailed { .. } => crate::exitcode::IOERR,
    }
}
