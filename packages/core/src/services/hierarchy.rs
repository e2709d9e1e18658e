//! Hierarchy Mutator
//!
//! The hierarchy is nothing but BelongsTo edges (Goal → Vision,
//! Project → Goal) with a `sort_order`. A move keeps exactly one such edge
//! per child and keeps sibling order dense (`0..n`) under both the new and
//! the old parent. Everything happens in one [`MutationBatch`], so readers
//! never observe a child with two parents or none.

use std::collections::BTreeSet;

use crate::db::MutationBatch;
use crate::models::{Edge, EdgeType, NodeType};
use crate::services::error::GraphResult;
use crate::services::graph_service::GraphService;

impl GraphService {
    /// Re-parent a goal under a vision
    ///
    /// `sort_order` is the position among the vision's goals; `None`
    /// appends at the end.
    pub async fn move_goal(
        &self,
        owner_id: &str,
        goal_id: &str,
        new_vision_id: &str,
        sort_order: Option<i64>,
    ) -> GraphResult<Edge> {
        self.move_under(
            owner_id,
            (goal_id, NodeType::Goal),
            (new_vision_id, NodeType::Vision),
            sort_order,
        )
        .await
    }

    /// Re-parent a project under a goal
    pub async fn move_project(
        &self,
        owner_id: &str,
        project_id: &str,
        new_goal_id: &str,
        sort_order: Option<i64>,
    ) -> GraphResult<Edge> {
        self.move_under(
            owner_id,
            (project_id, NodeType::Project),
            (new_goal_id, NodeType::Goal),
            sort_order,
        )
        .await
    }

    /// Current BelongsTo children of `parent_id` other than `exclude`, in
    /// sibling order
    async fn siblings_of(&self, parent_id: &str, exclude: &str) -> GraphResult<Vec<Edge>> {
        let mut siblings: Vec<Edge> = self
            .store
            .list_edges_by_target(parent_id)
            .await?
            .into_iter()
            .filter(|e| e.edge_type == EdgeType::BelongsTo && e.source_id != exclude)
            .collect();
        siblings.sort_by_key(|e| (e.sort_order.is_none(), e.sort_order));
        Ok(siblings)
    }

    pub(crate) async fn move_under(
        &self,
        owner_id: &str,
        (child_id, child_type): (&str, NodeType),
        (parent_id, parent_type): (&str, NodeType),
        sort_order: Option<i64>,
    ) -> GraphResult<Edge> {
        self.owned_node_of_type(owner_id, child_id, child_type)
            .await?;
        self.owned_node_of_type(owner_id, parent_id, parent_type)
            .await?;

        let previous: Vec<Edge> = self
            .store
            .list_edges_by_source(child_id)
            .await?
            .into_iter()
            .filter(|e| e.edge_type == EdgeType::BelongsTo)
            .collect();

        let mut batch = MutationBatch::new();
        for edge in &previous {
            batch = batch.delete_edge(&edge.id);
        }

        let mut siblings = self.siblings_of(parent_id, child_id).await?;
        let position = match sort_order {
            Some(order) => usize::try_from(order.max(0))
                .unwrap_or(usize::MAX)
                .min(siblings.len()),
            None => siblings.len(),
        };

        let moved = Edge::new(owner_id, child_id, parent_id, EdgeType::BelongsTo)
            .with_sort_order(position as i64);
        siblings.insert(position, moved.clone());

        for (index, mut edge) in siblings.into_iter().enumerate() {
            let order = index as i64;
            if edge.id == moved.id || edge.sort_order != Some(order) {
                edge.sort_order = Some(order);
                batch = batch.save_edge(edge);
            }
        }

        // Close the gap left under the old parent(s)
        let old_parents: BTreeSet<&str> = previous
            .iter()
            .map(|e| e.target_id.as_str())
            .filter(|id| *id != parent_id)
            .collect();
        for old_parent in old_parents {
            for (index, mut edge) in self
                .siblings_of(old_parent, child_id)
                .await?
                .into_iter()
                .enumerate()
            {
                let order = index as i64;
                if edge.sort_order != Some(order) {
                    edge.sort_order = Some(order);
                    batch = batch.save_edge(edge);
                }
            }
        }

        let mutations = batch.len();
        self.store.apply_batch(batch).await?;

        tracing::info!(
            child_id,
            parent_id,
            position,
            replaced = previous.len(),
            mutations,
            "Moved node in hierarchy"
        );
        Ok(moved)
    }
}
