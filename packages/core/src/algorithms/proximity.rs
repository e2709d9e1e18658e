//! Proximity profile and influence score of a single node

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::algorithms::adjacency::{AdjacencyIndex, Direction};
use crate::config::InfluenceWeights;
use crate::models::{Edge, EdgeType, NodeSummary};

/// One direct neighbor as seen from the scored node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborDetail {
    pub edge_id: String,
    pub edge_type: EdgeType,
    pub direction: Direction,
    pub node: NodeSummary,
    pub weight: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_strength: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_interaction_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityReport {
    pub node_id: String,
    pub total_connections: usize,
    pub counts_by_type: BTreeMap<EdgeType, usize>,
    pub neighbors: Vec<NeighborDetail>,
    /// 0 for an isolated node, approaching 100 for a dense, strong neighborhood
    pub influence_score: f64,
}

/// Influence of a set of touching edges
///
/// Each edge adds a non-negative contribution, and the saturating transform
/// is increasing, so the score never drops when an edge is added.
pub fn influence_score<'e>(edges: impl IntoIterator<Item = &'e Edge>, weights: &InfluenceWeights) -> f64 {
    let raw: f64 = edges
        .into_iter()
        .map(|edge| {
            weights.per_connection
                + weights.per_weight * edge.weight.max(0) as f64
                + weights.per_strength * f64::from(edge.relationship_strength.unwrap_or(0))
        })
        .sum();

    if raw <= 0.0 || weights.saturation <= 0.0 {
        return 0.0;
    }
    100.0 * (1.0 - (-raw / weights.saturation).exp())
}

/// Profile `node_id`'s one-hop neighborhood in both directions
///
/// Returns `None` when the node is not in the index.
pub fn proximity_report(
    index: &AdjacencyIndex<'_>,
    node_id: &str,
    weights: &InfluenceWeights,
) -> Option<ProximityReport> {
    let node = index.node(node_id)?;
    let hops = index.neighbors(node_id);

    let mut counts_by_type = BTreeMap::new();
    for hop in hops {
        *counts_by_type.entry(hop.edge.edge_type).or_insert(0) += 1;
    }

    let neighbors = hops
        .iter()
        .map(|hop| NeighborDetail {
            edge_id: hop.edge.id.clone(),
            edge_type: hop.edge.edge_type,
            direction: hop.direction,
            node: NodeSummary::from(hop.node),
            weight: hop.edge.weight,
            relationship_strength: hop.edge.relationship_strength,
            last_interaction_date: hop.edge.last_interaction_date,
        })
        .collect();

    Some(ProximityReport {
        node_id: node.id.clone(),
        total_connections: hops.len(),
        counts_by_type,
        neighbors,
        influence_score: influence_score(hops.iter().map(|hop| hop.edge), weights),
    })
}
