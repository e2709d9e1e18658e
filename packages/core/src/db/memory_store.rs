//! In-memory GraphStore
//!
//! Insertion-ordered maps behind a `tokio::sync::RwLock`. Batches are applied
//! to a working copy that replaces the live state only when every mutation
//! succeeded, so readers never see a partial batch.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::db::graph_store::{GraphStore, Mutation, MutationBatch};
use crate::models::{DeleteResult, Edge, Node, NodeFilter};

#[derive(Debug, Clone, Default)]
struct GraphState {
    nodes: IndexMap<String, Node>,
    edges: IndexMap<String, Edge>,
}

impl GraphState {
    fn save_node(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    fn save_edge(&mut self, edge: Edge) -> Result<()> {
        for endpoint in [&edge.source_id, &edge.target_id] {
            if !self.nodes.contains_key(endpoint.as_str()) {
                bail!(
                    "Edge {} references missing node {}",
                    edge.id,
                    endpoint
                );
            }
        }
        self.edges.insert(edge.id.clone(), edge);
        Ok(())
    }

    fn delete_node(&mut self, id: &str) -> DeleteResult {
        if self.nodes.shift_remove(id).is_none() {
            return DeleteResult::not_found();
        }
        let before = self.edges.len();
        self.edges.retain(|_, edge| !edge.touches(id));
        DeleteResult::existed(before - self.edges.len())
    }

    fn delete_edge(&mut self, id: &str) -> bool {
        self.edges.shift_remove(id).is_some()
    }

    fn apply(&mut self, mutation: Mutation) -> Result<()> {
        match mutation {
            Mutation::SaveNode(node) => self.save_node(node),
            Mutation::SaveEdge(edge) => self.save_edge(edge)?,
            Mutation::DeleteNode(id) => {
                self.delete_node(&id);
            }
            Mutation::DeleteEdge(id) => {
                self.delete_edge(&id);
            }
        }
        Ok(())
    }
}

/// GraphStore held entirely in process memory
///
/// Cloning is cheap and shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraphStore {
    state: Arc<RwLock<GraphState>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn node_count(&self) -> usize {
        self.state.read().await.nodes.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.state.read().await.edges.len()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        Ok(self.state.read().await.nodes.get(id).cloned())
    }

    async fn list_nodes_by_owner(&self, owner_id: &str, filter: &NodeFilter) -> Result<Vec<Node>> {
        let state = self.state.read().await;
        Ok(state
            .nodes
            .values()
            .filter(|node| node.owner_id == owner_id && filter.matches(node))
            .cloned()
            .collect())
    }

    async fn save_node(&self, node: Node) -> Result<Node> {
        self.state.write().await.save_node(node.clone());
        Ok(node)
    }

    async fn delete_node(&self, id: &str) -> Result<DeleteResult> {
        Ok(self.state.write().await.delete_node(id))
    }

    async fn get_edge(&self, id: &str) -> Result<Option<Edge>> {
        Ok(self.state.read().await.edges.get(id).cloned())
    }

    async fn list_edges_by_owner(&self, owner_id: &str) -> Result<Vec<Edge>> {
        let state = self.state.read().await;
        Ok(state
            .edges
            .values()
            .filter(|edge| edge.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_edges_by_source(&self, node_id: &str) -> Result<Vec<Edge>> {
        let state = self.state.read().await;
        Ok(state
            .edges
            .values()
            .filter(|edge| edge.source_id == node_id)
            .cloned()
            .collect())
    }

    async fn list_edges_by_target(&self, node_id: &str) -> Result<Vec<Edge>> {
        let state = self.state.read().await;
        Ok(state
            .edges
            .values()
            .filter(|edge| edge.target_id == node_id)
            .cloned()
            .collect())
    }

    async fn save_edge(&self, edge: Edge) -> Result<Edge> {
        self.state.write().await.save_edge(edge.clone())?;
        Ok(edge)
    }

    async fn delete_edge(&self, id: &str) -> Result<bool> {
        Ok(self.state.write().await.delete_edge(id))
    }

    async fn apply_batch(&self, batch: MutationBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().await;
        let mut working = state.clone();
        let total = batch.len();
        for (index, mutation) in batch.into_mutations().into_iter().enumerate() {
            working
                .apply(mutation)
                .with_context(|| format!("Batch mutation {} of {} failed", index + 1, total))?;
        }
        *state = working;
        Ok(())
    }
}
