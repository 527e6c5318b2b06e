//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
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

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        Self::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        Self::Infra(InfraError::from(e))
    }
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Selector { .. } => exitcode::SOFTWARE,
                InfraError::Application(app) => match app {
                    ApplicationError::Domain(DomainError::ConfirmationRequired { .. }) => {
                        exitcode::USAGE
                    }
                    ApplicationError::Domain(_) => exitcode::DATAERR,
                    ApplicationError::InvalidFormat { .. } => exitcode::DATAERR,
                    ApplicationError::NoMapLoaded | ApplicationError::MapFileNotFound(_) => {
                        exitcode::NOINPUT
                    }
                    ApplicationError::AlreadyExists(_) => exitcode::CANTCREAT,
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                    ApplicationError::OperationFailed { .. } => exitcode::IOERR,
                },
            },
        }
    }
}
