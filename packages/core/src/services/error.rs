//! Service Layer Error Types
//!
//! Every caller-facing failure of the graph engine maps to one of these
//! variants, carrying the offending id and (where relevant) the expected
//! node type.

use crate::embedding::EmbeddingError;
use crate::models::{NodeType, ValidationError};
use thiserror::Error;

/// Graph engine errors
#[derive(Error, Debug)]
pub enum GraphError {
    /// Referenced node or edge does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The acting owner does not own the referenced record
    #[error("Owner {owner_id} is not allowed to access {kind} {id}")]
    Unauthorized {
        kind: &'static str,
        id: String,
        owner_id: String,
    },

    /// Operation is not valid for the record as it is, e.g. a node of the
    /// wrong type
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// An external collaborator failed in a way the caller must see
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Persistence failure, with the store's context chain
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl GraphError {
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Node",
            id: id.into(),
        }
    }

    pub fn edge_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Edge",
            id: id.into(),
        }
    }

    pub fn node_unauthorized(id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self::Unauthorized {
            kind: "node",
            id: id.into(),
            owner_id: owner_id.into(),
        }
    }

    pub fn edge_unauthorized(id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self::Unauthorized {
            kind: "edge",
            id: id.into(),
            owner_id: owner_id.into(),
        }
    }

    pub fn wrong_node_type(id: impl AsRef<str>, expected: NodeType, actual: NodeType) -> Self {
        Self::InvalidState(format!(
            "node {} is a {}, expected {}",
            id.as_ref(),
            actual,
            expected
        ))
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<EmbeddingError> for GraphError {
    fn from(err: EmbeddingError) -> Self {
        Self::UpstreamUnavailable(err.to_string())
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_ids() {
        assert_eq!(
            GraphError::node_not_found("n-1").to_string(),
            "Node not found: n-1"
        );
        assert_eq!(
            GraphError::wrong_node_type("n-2", NodeType::Goal, NodeType::Person).to_string(),
            "Invalid state: node n-2 is a person, expected goal"
        );
        assert!(GraphError::edge_unauthorized("e-1", "bob").is_unauthorized());
    }

    #[test]
    fn test_store_errors_keep_context() {
        let err: GraphError = anyhow::anyhow!("disk full").context("Failed to save node").into();
        assert_eq!(err.to_string(), "Failed to save node");
        assert!(matches!(err, GraphError::Store(_)));
    }
}
