//! Similarity recommendations and goal linking
//!
//! Embeddings are computed lazily through [`ensure_embedding`] and then
//! saved here, in plain sight, by the operation that asked for them. A
//! missing or failing embedding model never fails a recommendation: the
//! caller just gets an empty list.

use serde::{Deserialize, Serialize};

use crate::algorithms::{cosine_similarity, rank_by_similarity, SimilaritySuggestion};
use crate::embedding::{ensure_embedding, EmbeddingOutcome};
use crate::models::{Edge, EdgeType, NewEdge, Node, NodeFilter, NodeType};
use crate::services::error::{GraphError, GraphResult};
use crate::services::graph_service::GraphService;

/// Attributes carried by a person → goal Supports link
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_strength: Option<u8>,
    /// Filled from embedding similarity when omitted and both sides are embedded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl GraphService {
    /// Give `node` an embedding if it lacks one and persist it
    ///
    /// Returns the node as stored afterwards. Without a provider the node is
    /// returned unchanged.
    async fn with_lazy_embedding(&self, node: Node) -> GraphResult<Node> {
        let Some(provider) = &self.embeddings else {
            if node.embedding.is_none() {
                tracing::warn!(node_id = %node.id, "No embedding provider configured");
            }
            return Ok(node);
        };

        let outcome = ensure_embedding(
            node,
            provider.as_ref(),
            self.config.embedding_timeout(),
            false,
        )
        .await;

        if outcome.needs_save() {
            return Ok(self.store.save_node(outcome.into_node()).await?);
        }
        Ok(outcome.into_node())
    }

    /// People whose embeddings are closest to the goal's
    ///
    /// Only strictly positive similarities are returned, best first,
    /// truncated to `max(limit, 1)`.
    pub async fn similarity_recommendations(
        &self,
        owner_id: &str,
        goal_id: &str,
        limit: usize,
    ) -> GraphResult<Vec<SimilaritySuggestion>> {
        let goal = self
            .owned_node_of_type(owner_id, goal_id, NodeType::Goal)
            .await?;
        let goal = self.with_lazy_embedding(goal).await?;

        let Some(target) = goal.embedding.as_deref() else {
            tracing::debug!(goal_id, "Goal has no embedding, no recommendations");
            return Ok(Vec::new());
        };

        let people = self
            .store
            .list_nodes_by_owner(owner_id, &NodeFilter::new().with_node_type(NodeType::Person))
            .await?;
        let suggestions = rank_by_similarity(target, &people, limit);

        tracing::debug!(
            goal_id,
            candidates = people.len(),
            suggestions = suggestions.len(),
            "Ranked similar people"
        );
        Ok(suggestions)
    }

    /// Link a person to a goal with a fresh Supports edge
    ///
    /// Any earlier Supports edge between the two is removed in the same
    /// batch.
    pub async fn link_person_to_goal(
        &self,
        owner_id: &str,
        person_id: &str,
        goal_id: &str,
        attributes: LinkAttributes,
    ) -> GraphResult<Edge> {
        let person = self
            .owned_node_of_type(owner_id, person_id, NodeType::Person)
            .await?;
        let goal = self
            .owned_node_of_type(owner_id, goal_id, NodeType::Goal)
            .await?;

        let relevance_score = attributes.relevance_score.or_else(|| {
            match (person.embedding.as_deref(), goal.embedding.as_deref()) {
                (Some(a), Some(b)) => Some(cosine_similarity(a, b)),
                _ => None,
            }
        });

        let new_edge = NewEdge {
            relationship_strength: attributes.relationship_strength,
            relevance_score,
            notes: attributes.notes,
            ..NewEdge::new(person_id, goal_id, EdgeType::Supports)
        };
        let edge = new_edge.into_edge(owner_id);
        edge.validate()?;

        self.replace_supports_edge(edge).await
    }

    /// Compute and store a fresh embedding for any owned node
    ///
    /// # Errors
    ///
    /// - `UpstreamUnavailable` when no provider is configured or it fails
    /// - `InvalidState` when the node has no text to embed
    pub async fn embed_node(&self, owner_id: &str, node_id: &str) -> GraphResult<Node> {
        let node = self.owned_node(owner_id, node_id).await?;
        let provider = self.embeddings.as_ref().ok_or_else(|| {
            GraphError::UpstreamUnavailable("no embedding provider configured".to_string())
        })?;

        match ensure_embedding(
            node,
            provider.as_ref(),
            self.config.embedding_timeout(),
            true,
        )
        .await
        {
            EmbeddingOutcome::Computed(node) | EmbeddingOutcome::Present(node) => {
                Ok(self.store.save_node(node).await?)
            }
            EmbeddingOutcome::NoText(_) => Err(GraphError::invalid_state(format!(
                "node {} has no text to embed",
                node_id
            ))),
            EmbeddingOutcome::Unavailable { error, .. } => Err(error.into()),
        }
    }
}
