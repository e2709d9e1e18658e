//! Graph Assembler
//!
//! Presentation-ready views of one owner's graph: a flat node/edge list for
//! visualization and the three-level Vision → Goal → Project tree built
//! from BelongsTo edges.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::{Edge, EdgeType, Node, NodeSummary, NodeType};
use crate::services::error::GraphResult;
use crate::services::graph_service::GraphService;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphViewNode {
    pub id: String,
    pub node_type: NodeType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_strength: Option<u8>,
}

impl From<&Node> for GraphViewNode {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            node_type: node.node_type(),
            name: node.name.clone(),
            description: node.description.clone(),
            sector: node.sector().map(str::to_string),
            tags: node.tags().to_vec(),
            relationship_strength: node.relationship_strength(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphViewEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub edge_type: EdgeType,
    pub weight: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_strength: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

impl From<&Edge> for GraphViewEdge {
    fn from(edge: &Edge) -> Self {
        Self {
            id: edge.id.clone(),
            source: edge.source_id.clone(),
            target: edge.target_id.clone(),
            edge_type: edge.edge_type,
            weight: edge.weight,
            relationship_strength: edge.relationship_strength,
            sort_order: edge.sort_order,
        }
    }
}

/// Flat graph for visualization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphViewNode>,
    pub edges: Vec<GraphViewEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLeaf {
    pub project: NodeSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalBranch {
    pub goal: NodeSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
    pub projects: Vec<ProjectLeaf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionTree {
    pub vision: NodeSummary,
    pub goals: Vec<GoalBranch>,
}

/// BelongsTo children of every parent, ordered by `sort_order` (unset last)
/// and then by edge creation
fn children_by_parent<'a>(
    edges: &'a [Edge],
    nodes: &HashMap<&str, &'a Node>,
    child_type: NodeType,
) -> HashMap<&'a str, Vec<(&'a Edge, &'a Node)>> {
    let mut children: HashMap<&str, Vec<(&Edge, &Node)>> = HashMap::new();
    for edge in edges.iter().filter(|e| e.edge_type == EdgeType::BelongsTo) {
        let Some(child) = nodes.get(edge.source_id.as_str()) else {
            continue;
        };
        if child.is_type(child_type) {
            children
                .entry(edge.target_id.as_str())
                .or_default()
                .push((edge, *child));
        }
    }
    for list in children.values_mut() {
        list.sort_by_key(|(edge, _)| (edge.sort_order.is_none(), edge.sort_order));
    }
    children
}

/// Assemble the vision tree from already-loaded records
pub fn build_vision_tree(nodes: &[Node], edges: &[Edge]) -> Vec<VisionTree> {
    let by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let goals_of = children_by_parent(edges, &by_id, NodeType::Goal);
    let projects_of = children_by_parent(edges, &by_id, NodeType::Project);

    nodes
        .iter()
        .filter(|n| n.is_type(NodeType::Vision))
        .map(|vision| {
            let goals = goals_of
                .get(vision.id.as_str())
                .map(|goals| {
                    goals
                        .iter()
                        .map(|(goal_edge, goal)| GoalBranch {
                            goal: NodeSummary::from(*goal),
                            sort_order: goal_edge.sort_order,
                            projects: projects_of
                                .get(goal.id.as_str())
                                .map(|projects| {
                                    projects
                                        .iter()
                                        .map(|(project_edge, project)| ProjectLeaf {
                                            project: NodeSummary::from(*project),
                                            sort_order: project_edge.sort_order,
                                        })
                                        .collect()
                                })
                                .unwrap_or_default(),
                        })
                        .collect()
                })
                .unwrap_or_default();

            VisionTree {
                vision: NodeSummary::from(vision),
                goals,
            }
        })
        .collect()
}

impl GraphService {
    /// All of `owner_id`'s nodes and the edges between them
    pub async fn graph_view(&self, owner_id: &str) -> GraphResult<GraphView> {
        let (nodes, edges) = self.owner_graph(owner_id).await?;
        let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

        let view = GraphView {
            nodes: nodes.iter().map(GraphViewNode::from).collect(),
            edges: edges
                .iter()
                .filter(|e| ids.contains(e.source_id.as_str()) && ids.contains(e.target_id.as_str()))
                .map(GraphViewEdge::from)
                .collect(),
        };

        tracing::debug!(
            owner_id,
            nodes = view.nodes.len(),
            edges = view.edges.len(),
            "Assembled graph view"
        );
        Ok(view)
    }

    /// Visions with their goals and projects; unattached goals and projects
    /// are left out
    pub async fn vision_tree(&self, owner_id: &str) -> GraphResult<Vec<VisionTree>> {
        let (nodes, edges) = self.owner_graph(owner_id).await?;
        Ok(build_vision_tree(&nodes, &edges))
    }
}
