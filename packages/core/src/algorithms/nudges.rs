//! Relationship nudges
//!
//! Flags Supports relationships that have gone quiet or are weak, so the
//! user knows whom to reach out to.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::algorithms::adjacency::AdjacencyIndex;
use crate::config::GraphEngineConfig;
use crate::models::{Edge, EdgeType, NodeSummary, NodeType, MAX_RELATIONSHIP_STRENGTH};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nudge {
    pub edge_id: String,
    pub person: NodeSummary,
    pub edge_type: EdgeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_interaction_date: Option<DateTime<Utc>>,
    /// `None` when no interaction was ever recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_contact: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_strength: Option<u8>,
    pub target_id: String,
    pub target_name: String,
    pub reasons: Vec<String>,
}

impl Nudge {
    /// Sort key: never-contacted first, then longest silence, then weakest
    fn urgency(&self) -> (Reverse<i64>, u8) {
        (
            Reverse(self.days_since_contact.unwrap_or(i64::MAX)),
            self.relationship_strength
                .unwrap_or(MAX_RELATIONSHIP_STRENGTH + 1),
        )
    }
}

/// Scan `edges` for Supports relationships needing attention
///
/// The person end of each edge is reported; edges with no Person endpoint in
/// the index are ignored. Results are truncated to `max(limit, 1)`.
pub fn relationship_nudges(
    index: &AdjacencyIndex<'_>,
    edges: &[Edge],
    config: &GraphEngineConfig,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<Nudge> {
    let mut nudges: Vec<Nudge> = edges
        .iter()
        .filter(|edge| edge.edge_type == EdgeType::Supports)
        .filter_map(|edge| nudge_for(index, edge, config, now))
        .collect();

    // Stable sort keeps edge order among equals
    nudges.sort_by_key(Nudge::urgency);
    nudges.truncate(limit.max(1));
    nudges
}

fn nudge_for(
    index: &AdjacencyIndex<'_>,
    edge: &Edge,
    config: &GraphEngineConfig,
    now: DateTime<Utc>,
) -> Option<Nudge> {
    let source = index.node(&edge.source_id)?;
    let target = index.node(&edge.target_id)?;
    let (person, other) = if source.is_type(NodeType::Person) {
        (source, target)
    } else if target.is_type(NodeType::Person) {
        (target, source)
    } else {
        return None;
    };

    let days_since_contact = edge
        .last_interaction_date
        .map(|at| (now - at).num_days());
    let strength = edge
        .relationship_strength
        .or_else(|| person.relationship_strength());

    let mut reasons = Vec::new();
    match days_since_contact {
        None => reasons.push("no recent contact (never recorded)".to_string()),
        Some(days) if days > config.stale_after_days => {
            reasons.push(format!("no recent contact ({} days)", days))
        }
        Some(_) => {}
    }
    if let Some(value) = strength {
        if value < config.weak_strength_threshold {
            reasons.push(format!(
                "relationship strength low ({}/{})",
                value, MAX_RELATIONSHIP_STRENGTH
            ));
        }
    }

    if reasons.is_empty() {
        return None;
    }

    Some(Nudge {
        edge_id: edge.id.clone(),
        person: NodeSummary::from(person),
        edge_type: edge.edge_type,
        last_interaction_date: edge.last_interaction_date,
        days_since_contact,
        relationship_strength: strength,
        target_id: other.id.clone(),
        target_name: other.name.clone(),
        reasons,
    })
}
