//! Read-side analyses: path suggestions, proximity, diagnostics, nudges
//!
//! Each call loads the owner's subgraph once, builds a request-scoped
//! [`AdjacencyIndex`] and hands it to the pure algorithms. Nothing is cached
//! across calls.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::algorithms::{
    self, diagnose_goal, find_goal_paths, proximity_report, AdjacencyIndex, GoalDiagnostics,
    Nudge, PathSuggestion, ProximityReport, Supporter,
};
use crate::models::{EdgeType, Node, NodeFilter, NodeType};
use crate::services::error::{GraphError, GraphResult};
use crate::services::graph_service::GraphService;

impl GraphService {
    /// People reachable from a goal through two or more hops
    ///
    /// `max_depth` defaults to the configured depth and is clamped to
    /// `[1, max_depth_limit]`.
    pub async fn goal_path_suggestions(
        &self,
        owner_id: &str,
        goal_id: &str,
        max_depth: Option<usize>,
        limit: usize,
    ) -> GraphResult<Vec<PathSuggestion>> {
        self.owned_node_of_type(owner_id, goal_id, NodeType::Goal)
            .await?;
        let depth = self.config.clamp_depth(max_depth);

        let (nodes, edges) = self.owner_graph(owner_id).await?;
        let index = AdjacencyIndex::build(&nodes, &edges);
        let suggestions = find_goal_paths(&index, goal_id, depth, limit);

        tracing::debug!(
            goal_id,
            depth,
            graph_nodes = index.node_count(),
            suggestions = suggestions.len(),
            "Computed goal path suggestions"
        );
        Ok(suggestions)
    }

    /// One-hop neighborhood profile and influence score of any node
    pub async fn proximity(&self, owner_id: &str, node_id: &str) -> GraphResult<ProximityReport> {
        self.owned_node(owner_id, node_id).await?;

        let (nodes, edges) = self.owner_graph(owner_id).await?;
        let index = AdjacencyIndex::build(&nodes, &edges);
        proximity_report(&index, node_id, &self.config.influence)
            .ok_or_else(|| GraphError::node_not_found(node_id))
    }

    /// Readiness, sector highlights and risk alerts for a goal
    pub async fn goal_diagnostics(
        &self,
        owner_id: &str,
        goal_id: &str,
    ) -> GraphResult<GoalDiagnostics> {
        self.goal_diagnostics_at(owner_id, goal_id, Utc::now()).await
    }

    /// [`goal_diagnostics`](Self::goal_diagnostics) evaluated at `now`
    pub async fn goal_diagnostics_at(
        &self,
        owner_id: &str,
        goal_id: &str,
        now: DateTime<Utc>,
    ) -> GraphResult<GoalDiagnostics> {
        let goal = self
            .owned_node_of_type(owner_id, goal_id, NodeType::Goal)
            .await?;

        let people = self
            .store
            .list_nodes_by_owner(owner_id, &NodeFilter::new().with_node_type(NodeType::Person))
            .await?;
        let people_by_id: HashMap<&str, &Node> =
            people.iter().map(|p| (p.id.as_str(), p)).collect();

        let incoming = self.store.list_edges_by_target(goal_id).await?;
        let supporters: Vec<Supporter<'_>> = incoming
            .iter()
            .filter(|e| e.edge_type == EdgeType::Supports && e.owner_id == owner_id)
            .filter_map(|edge| {
                people_by_id
                    .get(edge.source_id.as_str())
                    .map(|&person| Supporter { edge, person })
            })
            .collect();

        let network: Vec<&Node> = people.iter().collect();
        let diagnostics = diagnose_goal(&goal, &supporters, &network, &self.config, now);

        tracing::debug!(
            goal_id,
            supporters = diagnostics.supporter_count,
            readiness = %diagnostics.readiness,
            "Diagnosed goal"
        );
        Ok(diagnostics)
    }

    /// Supports relationships that are stale or weak, most urgent first
    pub async fn relationship_nudges(&self, owner_id: &str, limit: usize) -> GraphResult<Vec<Nudge>> {
        self.relationship_nudges_at(owner_id, limit, Utc::now()).await
    }

    /// [`relationship_nudges`](Self::relationship_nudges) evaluated at `now`
    pub async fn relationship_nudges_at(
        &self,
        owner_id: &str,
        limit: usize,
        now: DateTime<Utc>,
    ) -> GraphResult<Vec<Nudge>> {
        let (nodes, edges) = self.owner_graph(owner_id).await?;
        let index = AdjacencyIndex::build(&nodes, &edges);
        Ok(algorithms::relationship_nudges(
            &index,
            &edges,
            &self.config,
            now,
            limit,
        ))
    }
}
