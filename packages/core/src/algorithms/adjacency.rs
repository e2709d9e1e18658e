//! Symmetric adjacency index
//!
//! Built once per request from an owner's materialized nodes and edges.
//! Every edge is reachable from both endpoints, so traversals can ignore
//! direction without re-querying the store per hop.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Edge, Node};

/// Which way an edge points relative to the node it was reached from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// One hop out of a node
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a> {
    pub node: &'a Node,
    pub edge: &'a Edge,
    pub direction: Direction,
}

/// Borrowed, undirected view over one owner's subgraph
#[derive(Debug, Default)]
pub struct AdjacencyIndex<'a> {
    nodes: HashMap<&'a str, &'a Node>,
    neighbors: HashMap<&'a str, Vec<Neighbor<'a>>>,
    skipped_edges: usize,
}

impl<'a> AdjacencyIndex<'a> {
    /// Index `edges` over `nodes`
    ///
    /// Edges with an endpoint outside `nodes` and self-loops are skipped.
    /// Neighbor lists keep the order in which edges were supplied.
    pub fn build(nodes: &'a [Node], edges: &'a [Edge]) -> Self {
        let node_map: HashMap<&'a str, &'a Node> =
            nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let mut neighbors: HashMap<&'a str, Vec<Neighbor<'a>>> = HashMap::new();
        let mut skipped_edges = 0;

        for edge in edges {
            let (Some(&source), Some(&target)) = (
                node_map.get(edge.source_id.as_str()),
                node_map.get(edge.target_id.as_str()),
            ) else {
                skipped_edges += 1;
                continue;
            };
            if source.id == target.id {
                skipped_edges += 1;
                continue;
            }

            neighbors.entry(source.id.as_str()).or_default().push(Neighbor {
                node: target,
                edge,
                direction: Direction::Outgoing,
            });
            neighbors.entry(target.id.as_str()).or_default().push(Neighbor {
                node: source,
                edge,
                direction: Direction::Incoming,
            });
        }

        if skipped_edges > 0 {
            tracing::warn!(
                skipped_edges,
                "Ignoring edges with endpoints outside the indexed subgraph"
            );
        }

        Self {
            nodes: node_map,
            neighbors,
            skipped_edges,
        }
    }

    pub fn node(&self, id: &str) -> Option<&'a Node> {
        self.nodes.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Every hop out of `id`, outgoing and incoming interleaved in edge order
    pub fn neighbors(&self, id: &str) -> &[Neighbor<'a>] {
        self.neighbors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn degree(&self, id: &str) -> usize {
        self.neighbors(id).len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn skipped_edges(&self) -> usize {
        self.skipped_edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EdgeType;

    #[test]
    fn test_edges_are_reachable_from_both_ends() {
        let nodes = vec![
            Node::new_with_id("a", "o", "A", crate::models::NodeDetails::Vision),
            Node::person("o", "B"),
        ];
        let b = nodes[1].id.clone();
        let edges = vec![Edge::new("o", "a", &b, EdgeType::Knows)];

        let index = AdjacencyIndex::build(&nodes, &edges);
        assert_eq!(index.degree("a"), 1);
        assert_eq!(index.degree(&b), 1);
        assert_eq!(index.neighbors("a")[0].direction, Direction::Outgoing);
        assert_eq!(index.neighbors("a")[0].node.id, b);
        assert_eq!(index.neighbors(&b)[0].direction, Direction::Incoming);
        assert_eq!(index.neighbors(&b)[0].node.id, "a");
    }

    #[test]
    fn test_dangling_edges_are_skipped() {
        let nodes = vec![Node::person("o", "A")];
        let a = nodes[0].id.clone();
        let edges = vec![
            Edge::new("o", &a, "elsewhere", EdgeType::Knows),
            Edge::new("o", &a, &a, EdgeType::Knows),
        ];

        let index = AdjacencyIndex::build(&nodes, &edges);
        assert_eq!(index.degree(&a), 0);
        assert_eq!(index.skipped_edges(), 2);
        assert!(index.neighbors("elsewhere").is_empty());
    }
}
