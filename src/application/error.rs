//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{CodingSystem, DomainError};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("search not found: {0}")]
    SearchNotFound(String),

    #[error("draft uses {draft} but the terminology is {terminology}")]
    CodingSystemMismatch {
        draft: CodingSystem,
        terminology: CodingSystem,
    },

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
