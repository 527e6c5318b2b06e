//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::NodeId;

/// Domain errors represent violations of the mind map's structural rules.
/// These are independent of storage and front-end concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node not found: {0}")]
    NotFound(NodeId),

    #[error("max depth exceeded: '{text}' would land at depth {depth} (max {max})")]
    DepthExceeded {
        text: String,
        depth: usize,
        max: usize,
    },

    #[error("cannot move {node} under its own descendant {new_parent}")]
    Cycle { node: NodeId, new_parent: NodeId },

    #[error("node cannot be its own parent: {0}")]
    SelfParent(NodeId),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("corrupt map data: {0}")]
    CorruptData(String),

    #[error("deleting card '{text}' removes {count} node(s) and must be confirmed")]
    ConfirmationRequired {
        id: NodeId,
        text: String,
        count: usize,
    },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
