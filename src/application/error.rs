//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add storage/session context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("no map loaded: use 'new' or 'load'")]
    NoMapLoaded,

    #[error("file already exists: {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("map file not found: {0}")]
    MapFileNotFound(PathBuf),

    #[error("invalid map file {path}: {message}")]
    InvalidFormat { path: PathBuf, message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
