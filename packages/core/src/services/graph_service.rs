//! Graph Service - Owner-scoped CRUD
//!
//! `GraphService` is the only entry point callers use. It owns the
//! ownership checks: every operation receives an already-authenticated
//! owner id and verifies each record it touches belongs to that owner
//! before reading or mutating it. Stores below this layer never check.
//!
//! The read-side operations (views, paths, proximity, diagnostics,
//! recommendations) and the hierarchy moves live in sibling modules as
//! further `impl GraphService` blocks.
//!
//! # Example
//!
//! ```rust,no_run
//! use compass_core::db::InMemoryGraphStore;
//! use compass_core::models::{EdgeType, NewEdge, NewNode, NodeDetails, NodeType};
//! use compass_core::services::GraphService;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), compass_core::services::GraphError> {
//! let service = GraphService::new(Arc::new(InMemoryGraphStore::new()));
//!
//! let goal = service
//!     .create_node("alice", NewNode::new("Run a marathon", NodeDetails::default_for(NodeType::Goal)))
//!     .await?;
//! let coach = service
//!     .create_node("alice", NewNode::new("Coach Sam", NodeDetails::default_for(NodeType::Person)))
//!     .await?;
//!
//! service
//!     .create_edge("alice", NewEdge::new(&coach.id, &goal.id, EdgeType::Supports).with_relationship_strength(4))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::GraphEngineConfig;
use crate::db::{GraphStore, MutationBatch};
use crate::embedding::EmbeddingProvider;
use crate::models::{
    DeleteResult, Edge, EdgeType, EdgeUpdate, NewEdge, NewNode, Node, NodeFilter, NodeType,
    NodeUpdate,
};
use crate::services::error::{GraphError, GraphResult};

/// Relationship graph engine facade
#[derive(Clone)]
pub struct GraphService {
    pub(crate) store: Arc<dyn GraphStore>,
    pub(crate) embeddings: Option<Arc<dyn EmbeddingProvider>>,
    pub(crate) config: GraphEngineConfig,
}

impl GraphService {
    /// Create a service over `store` with default configuration and no
    /// embedding provider
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            embeddings: None,
            config: GraphEngineConfig::default(),
        }
    }

    /// Attach the embedding model used by similarity recommendations
    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embeddings = Some(provider);
        self
    }

    /// Replace the configuration, rejecting inconsistent values
    pub fn with_config(mut self, config: GraphEngineConfig) -> GraphResult<Self> {
        config
            .validate()
            .map_err(|e| GraphError::invalid_state(format!("invalid configuration: {}", e)))?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &GraphEngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    //
    // OWNERSHIP
    //

    /// Fetch a node, failing unless it exists and belongs to `owner_id`
    pub(crate) async fn owned_node(&self, owner_id: &str, node_id: &str) -> GraphResult<Node> {
        let node = self
            .store
            .get_node(node_id)
            .await?
            .ok_or_else(|| GraphError::node_not_found(node_id))?;

        if node.owner_id != owner_id {
            tracing::warn!(node_id, owner_id, "Rejected cross-owner node access");
            return Err(GraphError::node_unauthorized(node_id, owner_id));
        }
        Ok(node)
    }

    /// Like [`owned_node`](Self::owned_node) but also checks the node type
    pub(crate) async fn owned_node_of_type(
        &self,
        owner_id: &str,
        node_id: &str,
        expected: NodeType,
    ) -> GraphResult<Node> {
        let node = self.owned_node(owner_id, node_id).await?;
        if !node.is_type(expected) {
            return Err(GraphError::wrong_node_type(
                node_id,
                expected,
                node.node_type(),
            ));
        }
        Ok(node)
    }

    pub(crate) async fn owned_edge(&self, owner_id: &str, edge_id: &str) -> GraphResult<Edge> {
        let edge = self
            .store
            .get_edge(edge_id)
            .await?
            .ok_or_else(|| GraphError::edge_not_found(edge_id))?;

        if edge.owner_id != owner_id {
            tracing::warn!(edge_id, owner_id, "Rejected cross-owner edge access");
            return Err(GraphError::edge_unauthorized(edge_id, owner_id));
        }
        Ok(edge)
    }

    /// Every node and edge of `owner_id`, in creation order
    pub(crate) async fn owner_graph(&self, owner_id: &str) -> GraphResult<(Vec<Node>, Vec<Edge>)> {
        let nodes = self
            .store
            .list_nodes_by_owner(owner_id, &NodeFilter::new())
            .await?;
        let edges = self.store.list_edges_by_owner(owner_id).await?;
        Ok((nodes, edges))
    }

    //
    // NODES
    //

    /// Create a node for `owner_id`
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank name or out-of-range attributes
    /// - `InvalidState` when a caller-supplied id is already taken
    pub async fn create_node(&self, owner_id: &str, new_node: NewNode) -> GraphResult<Node> {
        let node = new_node.into_node(owner_id);
        node.validate()?;

        if self.store.get_node(&node.id).await?.is_some() {
            return Err(GraphError::invalid_state(format!(
                "node {} already exists",
                node.id
            )));
        }

        let node = self.store.save_node(node).await?;
        tracing::info!(node_id = %node.id, node_type = %node.node_type(), owner_id, "Created node");
        Ok(node)
    }

    pub async fn get_node(&self, owner_id: &str, node_id: &str) -> GraphResult<Node> {
        self.owned_node(owner_id, node_id).await
    }

    /// Apply a sparse update
    ///
    /// Changing the node type is refused with `InvalidState`. Changing any
    /// text field drops the stored embedding.
    pub async fn update_node(
        &self,
        owner_id: &str,
        node_id: &str,
        update: NodeUpdate,
    ) -> GraphResult<Node> {
        let mut node = self.owned_node(owner_id, node_id).await?;

        if update.is_empty() {
            return Ok(node);
        }

        if let Some(details) = &update.details {
            if details.node_type() != node.node_type() {
                return Err(GraphError::invalid_state(format!(
                    "cannot change node {} from {} to {}",
                    node_id,
                    node.node_type(),
                    details.node_type()
                )));
            }
        }

        let text_changed = node.apply_update(update);
        node.validate()?;

        let node = self.store.save_node(node).await?;
        tracing::debug!(node_id, text_changed, "Updated node");
        Ok(node)
    }

    pub async fn list_nodes(&self, owner_id: &str, filter: &NodeFilter) -> GraphResult<Vec<Node>> {
        Ok(self.store.list_nodes_by_owner(owner_id, filter).await?)
    }

    /// Delete a node together with every edge touching it
    pub async fn delete_node(&self, owner_id: &str, node_id: &str) -> GraphResult<DeleteResult> {
        self.owned_node(owner_id, node_id).await?;

        let result = self.store.delete_node(node_id).await?;
        tracing::info!(
            node_id,
            removed_edges = result.removed_edges,
            "Deleted node with cascading edges"
        );
        Ok(result)
    }

    //
    // EDGES
    //

    /// Create an edge between two nodes of `owner_id`
    ///
    /// A Supports edge replaces any earlier Supports edge between the same
    /// pair, in either direction, so at most one exists afterwards. A
    /// BelongsTo edge is a hierarchy move: the child is detached from its old
    /// parent and placed at `sort_order` (or appended) under the new one.
    ///
    /// # Errors
    ///
    /// - `Validation` for self-loops and out-of-range attributes
    /// - `NotFound` / `Unauthorized` when an endpoint is missing or foreign
    /// - `InvalidState` for a BelongsTo edge other than Goal → Vision or
    ///   Project → Goal
    pub async fn create_edge(&self, owner_id: &str, new_edge: NewEdge) -> GraphResult<Edge> {
        let edge = new_edge.into_edge(owner_id);
        edge.validate()?;

        let source = self.owned_node(owner_id, &edge.source_id).await?;
        self.owned_node(owner_id, &edge.target_id).await?;

        if edge.edge_type == EdgeType::BelongsTo {
            let parent_type = match source.node_type() {
                NodeType::Goal => NodeType::Vision,
                NodeType::Project => NodeType::Goal,
                other => {
                    return Err(GraphError::invalid_state(format!(
                        "node {} is a {}, only goals and projects have a parent",
                        source.id, other
                    )));
                }
            };
            return self
                .move_under(
                    owner_id,
                    (&source.id, source.node_type()),
                    (&edge.target_id, parent_type),
                    edge.sort_order,
                )
                .await;
        }

        if edge.edge_type == EdgeType::Supports {
            return self.replace_supports_edge(edge).await;
        }

        let edge = self.store.save_edge(edge).await?;
        tracing::debug!(edge_id = %edge.id, edge_type = %edge.edge_type, "Created edge");
        Ok(edge)
    }

    /// Supports edges between `a` and `b` in either direction
    pub(crate) async fn supports_edges_between(&self, a: &str, b: &str) -> GraphResult<Vec<Edge>> {
        let edges = self.store.list_edges_touching(a).await?;
        Ok(edges
            .into_iter()
            .filter(|e| e.edge_type == EdgeType::Supports && e.other_end(a) == Some(b))
            .collect())
    }

    /// Delete prior Supports edges of the pair and save `edge`, atomically
    pub(crate) async fn replace_supports_edge(&self, edge: Edge) -> GraphResult<Edge> {
        let prior = self
            .supports_edges_between(&edge.source_id, &edge.target_id)
            .await?;

        let mut batch = MutationBatch::new();
        for old in &prior {
            batch = batch.delete_edge(&old.id);
        }
        batch = batch.save_edge(edge.clone());
        self.store.apply_batch(batch).await?;

        tracing::info!(
            edge_id = %edge.id,
            source_id = %edge.source_id,
            target_id = %edge.target_id,
            replaced = prior.len(),
            "Saved supports edge"
        );
        Ok(edge)
    }

    pub async fn get_edge(&self, owner_id: &str, edge_id: &str) -> GraphResult<Edge> {
        self.owned_edge(owner_id, edge_id).await
    }

    pub async fn update_edge(
        &self,
        owner_id: &str,
        edge_id: &str,
        update: EdgeUpdate,
    ) -> GraphResult<Edge> {
        let mut edge = self.owned_edge(owner_id, edge_id).await?;
        if update.is_empty() {
            return Ok(edge);
        }
        if edge.edge_type == EdgeType::BelongsTo && update.sort_order.is_some() {
            return Err(GraphError::invalid_state(format!(
                "edge {} is a hierarchy edge, reorder it with move_goal or move_project",
                edge.id
            )));
        }

        update.apply_to(&mut edge);
        edge.validate()?;
        Ok(self.store.save_edge(edge).await?)
    }

    /// Stamp a contact on an edge, optionally re-rating the relationship
    pub async fn record_interaction(
        &self,
        owner_id: &str,
        edge_id: &str,
        at: DateTime<Utc>,
        relationship_strength: Option<u8>,
    ) -> GraphResult<Edge> {
        let mut update = EdgeUpdate::new().with_last_interaction(Some(at));
        if let Some(strength) = relationship_strength {
            update = update.with_relationship_strength(Some(strength));
        }
        self.update_edge(owner_id, edge_id, update).await
    }

    pub async fn delete_edge(&self, owner_id: &str, edge_id: &str) -> GraphResult<()> {
        self.owned_edge(owner_id, edge_id).await?;
        self.store.delete_edge(edge_id).await?;
        tracing::debug!(edge_id, "Deleted edge");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryGraphStore;
    use crate::models::NodeDetails;

    fn service() -> GraphService {
        GraphService::new(Arc::new(InMemoryGraphStore::new()))
    }

    fn new_node(name: &str, node_type: NodeType) -> NewNode {
        NewNode::new(name, NodeDetails::default_for(node_type))
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let service = service();
        let err = service
            .create_node("alice", new_node("   ", NodeType::Goal))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let service = service();
        service
            .create_node("alice", new_node("Vision", NodeType::Vision).with_id("v-1"))
            .await
            .unwrap();
        let err = service
            .create_node("alice", new_node("Other", NodeType::Vision).with_id("v-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_type_change_is_refused() {
        let service = service();
        let goal = service
            .create_node("alice", new_node("Goal", NodeType::Goal))
            .await
            .unwrap();

        let err = service
            .update_node(
                "alice",
                &goal.id,
                NodeUpdate::new().with_details(NodeDetails::default_for(NodeType::Person)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_text_update_drops_embedding() {
        let service = service();
        let goal = service
            .create_node("alice", new_node("Goal", NodeType::Goal))
            .await
            .unwrap();
        let mut with_vector = goal.clone();
        with_vector.set_embedding(vec![1.0, 0.0]);
        service.store().save_node(with_vector).await.unwrap();

        let updated = service
            .update_node("alice", &goal.id, NodeUpdate::new().with_name("Renamed"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert!(updated.embedding.is_none());
    }

    #[tokio::test]
    async fn test_record_interaction_stamps_edge() {
        let service = service();
        let goal = service
            .create_node("alice", new_node("Goal", NodeType::Goal))
            .await
            .unwrap();
        let person = service
            .create_node("alice", new_node("Pat", NodeType::Person))
            .await
            .unwrap();
        let edge = service
            .create_edge("alice", NewEdge::new(&person.id, &goal.id, EdgeType::Supports))
            .await
            .unwrap();

        let at = Utc::now();
        let edge = service
            .record_interaction("alice", &edge.id, at, Some(4))
            .await
            .unwrap();
        assert_eq!(edge.last_interaction_date, Some(at));
        assert_eq!(edge.relationship_strength, Some(4));

        let err = service
            .record_interaction("bob", &edge.id, at, None)
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = GraphEngineConfig {
            max_depth_limit: 0,
            ..GraphEngineConfig::default()
        };
        assert!(service().with_config(config).is_err());
    }
}
