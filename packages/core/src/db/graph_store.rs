//! GraphStore Trait - Persistence Abstraction
//!
//! This module defines the `GraphStore` trait that abstracts node and edge
//! persistence for the relationship graph. Business logic in
//! [`GraphService`](crate::services::GraphService) only ever talks to this
//! trait, so the in-memory store used by tests and the libsql-backed store
//! are interchangeable.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so embedded and networked
//!    backends share one contract
//! 2. **Ownership Semantics**: Write methods take values by ownership;
//!    callers clone if they need to keep them
//! 3. **Error Handling**: `anyhow::Result` with context at each storage step;
//!    the service layer maps failures into its own taxonomy
//! 4. **Atomic Units**: Multi-step mutations (hierarchy moves, supporter
//!    replacement) go through [`MutationBatch`], applied all-or-nothing
//! 5. **No Ownership Checks**: The store is a dumb, owner-scoped record
//!    keeper; authorization lives in the service layer
//!
//! # Examples
//!
//! ```rust,no_run
//! use compass_core::db::{GraphStore, InMemoryGraphStore, MutationBatch};
//! use compass_core::models::{Edge, EdgeType, Node};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = InMemoryGraphStore::new();
//!
//!     let goal = store.save_node(Node::goal("user-1", "Open a bakery")).await?;
//!     let person = store.save_node(Node::person("user-1", "Ana")).await?;
//!
//!     let batch = MutationBatch::new()
//!         .save_edge(Edge::new("user-1", &person.id, &goal.id, EdgeType::Supports));
//!     store.apply_batch(batch).await?;
//!
//!     let result = store.delete_node(&goal.id).await?;
//!     assert_eq!(result.removed_edges, 1);
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{DeleteResult, Edge, Node, NodeFilter};

/// A single write inside a [`MutationBatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert or replace a node
    SaveNode(Node),
    /// Insert or replace an edge; both endpoints must exist once applied
    SaveEdge(Edge),
    /// Delete a node together with every edge touching it
    DeleteNode(String),
    /// Delete one edge; missing ids are ignored
    DeleteEdge(String),
}

/// Ordered list of writes applied as one atomic unit
///
/// Mutations apply in insertion order, so a batch may delete an edge and
/// then save its replacement. Readers never observe a half-applied batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationBatch {
    mutations: Vec<Mutation>,
}

impl MutationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_node(mut self, node: Node) -> Self {
        self.mutations.push(Mutation::SaveNode(node));
        self
    }

    pub fn save_edge(mut self, edge: Edge) -> Self {
        self.mutations.push(Mutation::SaveEdge(edge));
        self
    }

    pub fn delete_node(mut self, id: impl Into<String>) -> Self {
        self.mutations.push(Mutation::DeleteNode(id.into()));
        self
    }

    pub fn delete_edge(mut self, id: impl Into<String>) -> Self {
        self.mutations.push(Mutation::DeleteEdge(id.into()));
        self
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

/// Persistence contract for the relationship graph
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; a single store is shared across
/// request tasks behind an `Arc`.
///
/// # Ordering
///
/// Listings return records in creation order so that every traversal built
/// on top of them is deterministic.
#[async_trait]
pub trait GraphStore: Send + Sync {
    //
    // NODES
    //

    /// Get node by ID; `Ok(None)` when it does not exist
    async fn get_node(&self, id: &str) -> Result<Option<Node>>;

    /// List an owner's nodes matching `filter`
    async fn list_nodes_by_owner(&self, owner_id: &str, filter: &NodeFilter) -> Result<Vec<Node>>;

    /// Insert or replace a node
    async fn save_node(&self, node: Node) -> Result<Node>;

    /// Delete a node and every edge where it is source or target
    ///
    /// Idempotent: deleting a missing node returns `DeleteResult::not_found()`.
    async fn delete_node(&self, id: &str) -> Result<DeleteResult>;

    //
    // EDGES
    //

    /// Get edge by ID; `Ok(None)` when it does not exist
    async fn get_edge(&self, id: &str) -> Result<Option<Edge>>;

    /// All edges owned by `owner_id`
    async fn list_edges_by_owner(&self, owner_id: &str) -> Result<Vec<Edge>>;

    /// Edges whose source is `node_id`
    async fn list_edges_by_source(&self, node_id: &str) -> Result<Vec<Edge>>;

    /// Edges whose target is `node_id`
    async fn list_edges_by_target(&self, node_id: &str) -> Result<Vec<Edge>>;

    /// Insert or replace an edge
    ///
    /// # Errors
    ///
    /// Fails when either endpoint does not exist.
    async fn save_edge(&self, edge: Edge) -> Result<Edge>;

    /// Delete one edge, returning whether it existed
    async fn delete_edge(&self, id: &str) -> Result<bool>;

    //
    // BATCH
    //

    /// Apply every mutation in order, atomically
    ///
    /// On error nothing from the batch is visible.
    async fn apply_batch(&self, batch: MutationBatch) -> Result<()>;

    /// Edges touching `node_id` in either direction (outgoing first)
    async fn list_edges_touching(&self, node_id: &str) -> Result<Vec<Edge>> {
        let mut edges = self.list_edges_by_source(node_id).await?;
        let incoming = self.list_edges_by_target(node_id).await?;
        edges.extend(incoming.into_iter().filter(|e| e.source_id != node_id));
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EdgeType;

    #[test]
    fn test_batch_preserves_order() {
        let edge = Edge::new("owner-1", "a", "b", EdgeType::BelongsTo);
        let batch = MutationBatch::new()
            .delete_edge("old-edge")
            .save_edge(edge.clone())
            .delete_node("n1");

        assert_eq!(batch.len(), 3);
        assert_eq!(
            batch.mutations(),
            &[
                Mutation::DeleteEdge("old-edge".to_string()),
                Mutation::SaveEdge(edge),
                Mutation::DeleteNode("n1".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_batch() {
        assert!(MutationBatch::new().is_empty());
    }
}
