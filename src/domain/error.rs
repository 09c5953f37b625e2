//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::Code;

/// Domain errors represent caller errors against the hierarchy engine.
/// A `Conflict` status is not an error and never appears here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid graph at {code}: {reason}")]
    InvalidGraph { code: Code, reason: String },

    #[error("cycle detected in hierarchy: {0}")]
    CyclicGraph(Code),

    #[error("unknown code: {0}")]
    UnknownCode(Code),

    #[error("invalid mark '{0}': expected one of ?, +, -")]
    InvalidMark(String),

    #[error("invalid status token: '{0}'")]
    InvalidStatus(String),

    #[error("unknown coding system: {0}")]
    UnknownCodingSystem(String),

    #[error("code both included and excluded: {0}")]
    OverlappingDecisions(Code),

    #[error("draft already has a search for '{0}'")]
    DuplicateSearch(String),

    #[error("invalid filter '{0}': expected included, excluded, unresolved or in-conflict")]
    InvalidFilter(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
