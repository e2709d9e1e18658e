//! Embedding Collaborator
//!
//! The embedding model is a black box: text in, fixed-length vector out. It
//! may be slow or fail, and the engine treats either as "no embedding
//! available" rather than a fatal error.
//!
//! Lazy computation is an explicit two-step contract: [`ensure_embedding`]
//! returns the (possibly updated) node and says whether it changed, and the
//! caller decides to persist it. A read path never writes behind the
//! caller's back.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Node;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("Embedding generation failed: {0}")]
    GenerationFailed(String),

    #[error("Embedding generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Embedding model returned an invalid vector: {0}")]
    InvalidVector(String),
}

/// Text → vector model
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Text a node is embedded from
///
/// Non-empty name, description and notes joined by single spaces, then
/// trimmed as a whole; whitespace inside a part is kept. Returns `None` when
/// nothing is left.
pub fn embedding_text(node: &Node) -> Option<String> {
    let parts: Vec<&str> = [
        Some(node.name.as_str()),
        node.description.as_deref(),
        node.notes.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect();

    let text = parts.join(" ");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Call the provider with a deadline and reject unusable vectors
pub async fn request_embedding(
    provider: &dyn EmbeddingProvider,
    text: &str,
    timeout: Duration,
) -> Result<Vec<f32>, EmbeddingError> {
    let embedding = tokio::time::timeout(timeout, provider.generate_embedding(text))
        .await
        .map_err(|_| EmbeddingError::Timeout(timeout))??;

    if embedding.is_empty() {
        return Err(EmbeddingError::InvalidVector("empty vector".to_string()));
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(EmbeddingError::InvalidVector(
            "vector contains non-finite values".to_string(),
        ));
    }
    Ok(embedding)
}

/// Result of [`ensure_embedding`]
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingOutcome {
    /// The node already carried an embedding
    Present(Node),
    /// A fresh embedding was attached; the caller should save the node
    Computed(Node),
    /// The node has no text to embed
    NoText(Node),
    /// The provider failed or timed out; the node is unchanged
    Unavailable { node: Node, error: EmbeddingError },
}

impl EmbeddingOutcome {
    pub fn node(&self) -> &Node {
        match self {
            EmbeddingOutcome::Present(node)
            | EmbeddingOutcome::Computed(node)
            | EmbeddingOutcome::NoText(node)
            | EmbeddingOutcome::Unavailable { node, .. } => node,
        }
    }

    pub fn into_node(self) -> Node {
        match self {
            EmbeddingOutcome::Present(node)
            | EmbeddingOutcome::Computed(node)
            | EmbeddingOutcome::NoText(node)
            | EmbeddingOutcome::Unavailable { node, .. } => node,
        }
    }

    /// Whether the node changed and must be persisted
    pub fn needs_save(&self) -> bool {
        matches!(self, EmbeddingOutcome::Computed(_))
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.node().embedding.as_deref()
    }
}

/// Make sure `node` carries an embedding, computing one if missing
///
/// With `force`, an existing embedding is recomputed.
pub async fn ensure_embedding(
    mut node: Node,
    provider: &dyn EmbeddingProvider,
    timeout: Duration,
    force: bool,
) -> EmbeddingOutcome {
    if node.embedding.is_some() && !force {
        return EmbeddingOutcome::Present(node);
    }

    let Some(text) = embedding_text(&node) else {
        return EmbeddingOutcome::NoText(node);
    };

    match request_embedding(provider, &text, timeout).await {
        Ok(embedding) => {
            tracing::debug!(node_id = %node.id, dimensions = embedding.len(), "Computed embedding");
            node.set_embedding(embedding);
            EmbeddingOutcome::Computed(node)
        }
        Err(error) => {
            tracing::warn!(node_id = %node.id, %error, "Embedding unavailable, continuing without it");
            EmbeddingOutcome::Unavailable { node, error }
        }
    }
}
