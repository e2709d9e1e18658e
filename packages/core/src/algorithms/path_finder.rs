//! Goal path suggestions
//!
//! Level-synchronous breadth-first search from a goal over the undirected
//! adjacency index. Each reached node remembers the best (highest
//! cumulative weight) parent found on its own level; later levels never
//! revisit it. People reached at two or more hops are suggestions, direct
//! connections are left out since the user already knows them.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::algorithms::adjacency::AdjacencyIndex;
use crate::models::{NodeSummary, NodeType};

/// Someone the user could reach through their network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSuggestion {
    pub person: NodeSummary,
    /// Hop count from the goal, always at least 2
    pub distance: usize,
    /// Node ids from the goal to the person, both inclusive
    pub path: Vec<String>,
    /// Sum of edge weights along `path`
    pub path_weight: i64,
}

#[derive(Debug, Clone)]
struct Visit<'a> {
    depth: usize,
    weight: i64,
    discovery: usize,
    parent: Option<&'a str>,
}

fn rank(a: &Visit<'_>, b: &Visit<'_>) -> Ordering {
    b.weight
        .cmp(&a.weight)
        .then(a.depth.cmp(&b.depth))
        .then(a.discovery.cmp(&b.discovery))
}

/// Rank people reachable from `goal_id` within `max_depth` hops
///
/// Results are ordered by cumulative path weight (descending), then hop
/// distance, then discovery order, and truncated to `max(limit, 1)`.
/// Returns an empty list when `goal_id` is not in the index.
pub fn find_goal_paths(
    index: &AdjacencyIndex<'_>,
    goal_id: &str,
    max_depth: usize,
    limit: usize,
) -> Vec<PathSuggestion> {
    let Some(goal) = index.node(goal_id) else {
        return Vec::new();
    };

    let mut visits: HashMap<&str, Visit<'_>> = HashMap::new();
    visits.insert(
        goal.id.as_str(),
        Visit {
            depth: 0,
            weight: 0,
            discovery: 0,
            parent: None,
        },
    );
    let mut discovered = 1;
    let mut frontier = vec![goal.id.as_str()];

    for depth in 1..=max_depth {
        let mut next: Vec<&str> = Vec::new();

        for &current in &frontier {
            let Some(current_weight) = visits.get(current).map(|v| v.weight) else {
                continue;
            };

            for hop in index.neighbors(current) {
                let candidate = current_weight.saturating_add(hop.edge.weight);
                match visits.get_mut(hop.node.id.as_str()) {
                    None => {
                        visits.insert(
                            hop.node.id.as_str(),
                            Visit {
                                depth,
                                weight: candidate,
                                discovery: discovered,
                                parent: Some(current),
                            },
                        );
                        discovered += 1;
                        next.push(hop.node.id.as_str());
                    }
                    // Better parent on the same level; not yet expanded
                    Some(visit) if visit.depth == depth && candidate > visit.weight => {
                        visit.weight = candidate;
                        visit.parent = Some(current);
                    }
                    Some(_) => {}
                }
            }
        }

        if next.is_empty() {
            break;
        }
        // Strongest paths expand first so ties resolve towards them
        next.sort_by(|a, b| rank(&visits[a], &visits[b]));
        tracing::debug!(depth, frontier = next.len(), "Path finder level expanded");
        frontier = next;
    }

    let mut candidates: Vec<(&str, &Visit<'_>)> = visits
        .iter()
        .filter(|(id, visit)| {
            visit.depth >= 2
                && index
                    .node(id)
                    .is_some_and(|node| node.is_type(NodeType::Person))
        })
        .map(|(id, visit)| (*id, visit))
        .collect();
    candidates.sort_by(|a, b| rank(a.1, b.1));
    candidates.truncate(limit.max(1));

    candidates
        .into_iter()
        .filter_map(|(id, visit)| {
            let person = index.node(id)?;
            Some(PathSuggestion {
                person: NodeSummary::from(person),
                distance: visit.depth,
                path: trace_path(&visits, id),
                path_weight: visit.weight,
            })
        })
        .collect()
}

fn trace_path(visits: &HashMap<&str, Visit<'_>>, id: &str) -> Vec<String> {
    let mut path = vec![id.to_string()];
    let mut cursor = visits.get(id).and_then(|v| v.parent);
    while let Some(parent) = cursor {
        path.push(parent.to_string());
        cursor = visits.get(parent).and_then(|v| v.parent);
    }
    path.reverse();
    path
}
