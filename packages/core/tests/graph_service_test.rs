//! Integration tests for GraphService CRUD, ownership and hierarchy
//!
//! Tests cover:
//! - Cascading node deletion
//! - Cross-owner access and cross-owner edges
//! - Replace-not-duplicate Supports edges
//! - Edge weight bounds
//! - Graph view and vision tree assembly
//! - Goal and project moves with dense sibling order

use anyhow::Result;
use compass_core::{
    db::InMemoryGraphStore,
    logging,
    models::{
        EdgeType, EdgeUpdate, NewEdge, NewNode, Node, NodeDetails, NodeFilter, NodeType,
        MAX_EDGE_WEIGHT,
    },
    services::{GraphError, GraphService, LinkAttributes},
    GraphStore,
};
use std::sync::Arc;

const ALICE: &str = "alice";
const BOB: &str = "bob";

/// Test helper: Create a service over a fresh in-memory store
fn create_test_service() -> (Arc<InMemoryGraphStore>, GraphService) {
    logging::init_tracing_with_default("warn");
    let store = Arc::new(InMemoryGraphStore::new());
    let service = GraphService::new(store.clone());
    (store, service)
}

async fn create_node(
    service: &GraphService,
    owner: &str,
    name: &str,
    node_type: NodeType,
) -> Result<Node> {
    Ok(service
        .create_node(owner, NewNode::new(name, NodeDetails::default_for(node_type)))
        .await?)
}

// =========================================================================
// Cascade Tests
// =========================================================================

#[tokio::test]
async fn test_delete_node_cascades_to_every_touching_edge() -> Result<()> {
    let (store, service) = create_test_service();
    let goal = create_node(&service, ALICE, "Launch podcast", NodeType::Goal).await?;
    let ana = create_node(&service, ALICE, "Ana", NodeType::Person).await?;
    let ben = create_node(&service, ALICE, "Ben", NodeType::Person).await?;

    service
        .create_edge(ALICE, NewEdge::new(&ana.id, &goal.id, EdgeType::Supports))
        .await?;
    service
        .create_edge(ALICE, NewEdge::new(&ben.id, &ana.id, EdgeType::Knows))
        .await?;
    service
        .create_edge(ALICE, NewEdge::new(&ben.id, &goal.id, EdgeType::Supports))
        .await?;

    let result = service.delete_node(ALICE, &ana.id).await?;
    assert!(result.existed);
    assert_eq!(result.removed_edges, 2);

    let remaining = store.list_edges_by_owner(ALICE).await?;
    assert_eq!(remaining.len(), 1);
    assert!(remaining.iter().all(|e| !e.touches(&ana.id)));

    let err = service.get_node(ALICE, &ana.id).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

// =========================================================================
// Ownership Tests
// =========================================================================

#[tokio::test]
async fn test_foreign_records_are_unauthorized() -> Result<()> {
    let (_store, service) = create_test_service();
    let goal = create_node(&service, ALICE, "Write a book", NodeType::Goal).await?;
    let editor = create_node(&service, ALICE, "Editor", NodeType::Person).await?;
    let edge = service
        .create_edge(ALICE, NewEdge::new(&editor.id, &goal.id, EdgeType::Supports))
        .await?;

    assert!(service.get_node(BOB, &goal.id).await.unwrap_err().is_unauthorized());
    assert!(service.delete_node(BOB, &goal.id).await.unwrap_err().is_unauthorized());
    assert!(service.delete_edge(BOB, &edge.id).await.unwrap_err().is_unauthorized());
    assert!(service
        .goal_path_suggestions(BOB, &goal.id, None, 5)
        .await
        .unwrap_err()
        .is_unauthorized());
    assert!(service
        .proximity(BOB, &editor.id)
        .await
        .unwrap_err()
        .is_unauthorized());
    assert!(service
        .goal_diagnostics(BOB, &goal.id)
        .await
        .unwrap_err()
        .is_unauthorized());

    // Bob's graph stays empty
    let view = service.graph_view(BOB).await?;
    assert!(view.nodes.is_empty() && view.edges.is_empty());

    // Alice's data is untouched
    assert_eq!(service.get_node(ALICE, &goal.id).await?.name, "Write a book");
    Ok(())
}

#[tokio::test]
async fn test_cross_owner_edges_cannot_be_created() -> Result<()> {
    let (store, service) = create_test_service();
    let alice_goal = create_node(&service, ALICE, "Alice goal", NodeType::Goal).await?;
    let bob_friend = create_node(&service, BOB, "Bob friend", NodeType::Person).await?;

    let err = service
        .create_edge(
            ALICE,
            NewEdge::new(&bob_friend.id, &alice_goal.id, EdgeType::Supports),
        )
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());

    let err = service
        .link_person_to_goal(BOB, &bob_friend.id, &alice_goal.id, LinkAttributes::default())
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());

    assert!(store.list_edges_by_owner(ALICE).await?.is_empty());
    assert!(store.list_edges_by_owner(BOB).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_missing_and_self_loop_edges_are_rejected() -> Result<()> {
    let (_store, service) = create_test_service();
    let goal = create_node(&service, ALICE, "Goal", NodeType::Goal).await?;

    let err = service
        .create_edge(ALICE, NewEdge::new(&goal.id, "missing", EdgeType::RelatedTo))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = service
        .create_edge(ALICE, NewEdge::new(&goal.id, &goal.id, EdgeType::RelatedTo))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Validation(_)));
    Ok(())
}

// =========================================================================
// Replace-not-duplicate Tests
// =========================================================================

#[tokio::test]
async fn test_edge_weight_must_stay_in_range() -> Result<()> {
    let (store, service) = create_test_service();
    let goal = create_node(&service, ALICE, "Open a bakery", NodeType::Goal).await?;
    let ana = create_node(&service, ALICE, "Ana", NodeType::Person).await?;
    let ben = create_node(&service, ALICE, "Ben", NodeType::Person).await?;

    let err = service
        .create_edge(
            ALICE,
            NewEdge::new(&ana.id, &goal.id, EdgeType::Supports).with_weight(i64::MAX),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Validation(_)));
    let err = service
        .create_edge(ALICE, NewEdge::new(&ana.id, &ben.id, EdgeType::Knows).with_weight(-3))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Validation(_)));
    assert!(store.list_edges_by_owner(ALICE).await?.is_empty());

    let knows = service
        .create_edge(ALICE, NewEdge::new(&ana.id, &ben.id, EdgeType::Knows).with_weight(5))
        .await?;
    let err = service
        .update_edge(ALICE, &knows.id, EdgeUpdate::new().with_weight(i64::MAX))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Validation(_)));

    // The heaviest accepted weights still rank without overflowing
    service
        .create_edge(
            ALICE,
            NewEdge::new(&ana.id, &goal.id, EdgeType::Supports).with_weight(MAX_EDGE_WEIGHT),
        )
        .await?;
    service
        .update_edge(ALICE, &knows.id, EdgeUpdate::new().with_weight(MAX_EDGE_WEIGHT))
        .await?;
    let suggestions = service
        .goal_path_suggestions(ALICE, &goal.id, None, 3)
        .await?;
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].path_weight, 2 * MAX_EDGE_WEIGHT);
    Ok(())
}

#[tokio::test]
async fn test_second_supports_edge_replaces_first() -> Result<()> {
    let (store, service) = create_test_service();
    let goal = create_node(&service, ALICE, "Open a bakery", NodeType::Goal).await?;
    let baker = create_node(&service, ALICE, "Baker", NodeType::Person).await?;

    service
        .create_edge(
            ALICE,
            NewEdge::new(&baker.id, &goal.id, EdgeType::Supports).with_relationship_strength(2),
        )
        .await?;
    service
        .link_person_to_goal(
            ALICE,
            &baker.id,
            &goal.id,
            LinkAttributes {
                relationship_strength: Some(5),
                relevance_score: Some(0.8),
                notes: Some("Offered a kitchen".to_string()),
            },
        )
        .await?;

    let supports: Vec<_> = store
        .list_edges_by_target(&goal.id)
        .await?
        .into_iter()
        .filter(|e| e.edge_type == EdgeType::Supports && e.source_id == baker.id)
        .collect();
    assert_eq!(supports.len(), 1);
    assert_eq!(supports[0].relationship_strength, Some(5));
    assert_eq!(supports[0].relevance_score, Some(0.8));
    assert_eq!(supports[0].notes.as_deref(), Some("Offered a kitchen"));

    // Other edge types between the same pair are left alone
    service
        .create_edge(ALICE, NewEdge::new(&baker.id, &goal.id, EdgeType::RelatedTo))
        .await?;
    assert_eq!(store.list_edges_by_target(&goal.id).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_link_requires_person_and_goal() -> Result<()> {
    let (_store, service) = create_test_service();
    let goal = create_node(&service, ALICE, "Goal", NodeType::Goal).await?;
    let project = create_node(&service, ALICE, "Project", NodeType::Project).await?;

    let err = service
        .link_person_to_goal(ALICE, &project.id, &goal.id, LinkAttributes::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidState(_)));
    Ok(())
}

// =========================================================================
// Listing and Assembly Tests
// =========================================================================

#[tokio::test]
async fn test_list_nodes_applies_filter() -> Result<()> {
    let (_store, service) = create_test_service();
    service
        .create_node(
            ALICE,
            NewNode::new("Frank", NodeDetails::default_for(NodeType::Person))
                .with_notes("Met at a climbing gym"),
        )
        .await?;
    create_node(&service, ALICE, "Grace", NodeType::Person).await?;
    create_node(&service, ALICE, "Climb El Cap", NodeType::Goal).await?;

    let climbers = service
        .list_nodes(
            ALICE,
            &NodeFilter::new()
                .with_node_type(NodeType::Person)
                .with_search("CLIMBING"),
        )
        .await?;
    let names: Vec<&str> = climbers.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Frank"]);
    Ok(())
}

#[tokio::test]
async fn test_graph_view_and_vision_tree() -> Result<()> {
    let (_store, service) = create_test_service();
    let vision = create_node(&service, ALICE, "Financial freedom", NodeType::Vision).await?;
    let goal = create_node(&service, ALICE, "Max out savings", NodeType::Goal).await?;
    let project = create_node(&service, ALICE, "Budget spreadsheet", NodeType::Project).await?;
    let orphan = create_node(&service, ALICE, "Unfiled goal", NodeType::Goal).await?;
    let advisor = create_node(&service, ALICE, "Advisor", NodeType::Person).await?;

    service.move_goal(ALICE, &goal.id, &vision.id, None).await?;
    service.move_project(ALICE, &project.id, &goal.id, None).await?;
    service
        .create_edge(ALICE, NewEdge::new(&advisor.id, &goal.id, EdgeType::Supports))
        .await?;

    let view = service.graph_view(ALICE).await?;
    assert_eq!(view.nodes.len(), 5);
    assert_eq!(view.edges.len(), 3);

    let tree = service.vision_tree(ALICE).await?;
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].vision.id, vision.id);
    assert_eq!(tree[0].goals.len(), 1);
    assert_eq!(tree[0].goals[0].goal.id, goal.id);
    assert_eq!(tree[0].goals[0].projects[0].project.id, project.id);
    assert!(tree[0].goals.iter().all(|g| g.goal.id != orphan.id));
    Ok(())
}

// =========================================================================
// Hierarchy Tests
// =========================================================================

#[tokio::test]
async fn test_move_goal_between_visions_leaves_one_parent() -> Result<()> {
    let (store, service) = create_test_service();
    let v1 = create_node(&service, ALICE, "V1", NodeType::Vision).await?;
    let v2 = create_node(&service, ALICE, "V2", NodeType::Vision).await?;
    let g1 = create_node(&service, ALICE, "G1", NodeType::Goal).await?;
    let g2 = create_node(&service, ALICE, "G2", NodeType::Goal).await?;
    let g3 = create_node(&service, ALICE, "G3", NodeType::Goal).await?;

    service.move_goal(ALICE, &g1.id, &v1.id, None).await?;
    service.move_goal(ALICE, &g2.id, &v1.id, None).await?;
    service.move_goal(ALICE, &g3.id, &v1.id, None).await?;

    service.move_goal(ALICE, &g2.id, &v2.id, None).await?;

    let parents: Vec<_> = store
        .list_edges_by_source(&g2.id)
        .await?
        .into_iter()
        .filter(|e| e.edge_type == EdgeType::BelongsTo)
        .collect();
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].target_id, v2.id);
    assert_eq!(parents[0].sort_order, Some(0));

    // V1's remaining goals are compacted to 0..n
    let mut v1_orders: Vec<(String, Option<i64>)> = store
        .list_edges_by_target(&v1.id)
        .await?
        .into_iter()
        .map(|e| (e.source_id, e.sort_order))
        .collect();
    v1_orders.sort_by_key(|(_, order)| *order);
    assert_eq!(
        v1_orders,
        vec![(g1.id.clone(), Some(0)), (g3.id.clone(), Some(1))]
    );
    Ok(())
}

#[tokio::test]
async fn test_move_project_inserts_and_renumbers_siblings() -> Result<()> {
    let (_store, service) = create_test_service();
    let goal = create_node(&service, ALICE, "Ship v1", NodeType::Goal).await?;
    let vision = create_node(&service, ALICE, "Product", NodeType::Vision).await?;
    service.move_goal(ALICE, &goal.id, &vision.id, None).await?;

    let mut projects = Vec::new();
    for name in ["Design", "Build", "Test"] {
        let project = create_node(&service, ALICE, name, NodeType::Project).await?;
        service.move_project(ALICE, &project.id, &goal.id, None).await?;
        projects.push(project);
    }

    let docs = create_node(&service, ALICE, "Docs", NodeType::Project).await?;
    let edge = service.move_project(ALICE, &docs.id, &goal.id, Some(1)).await?;
    assert_eq!(edge.sort_order, Some(1));

    let tree = service.vision_tree(ALICE).await?;
    let order: Vec<(&str, Option<i64>)> = tree[0].goals[0]
        .projects
        .iter()
        .map(|p| (p.project.name.as_str(), p.sort_order))
        .collect();
    assert_eq!(
        order,
        vec![
            ("Design", Some(0)),
            ("Docs", Some(1)),
            ("Build", Some(2)),
            ("Test", Some(3)),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_move_rejects_foreign_parent() -> Result<()> {
    let (store, service) = create_test_service();
    let goal = create_node(&service, ALICE, "Goal", NodeType::Goal).await?;
    let bobs_vision = create_node(&service, BOB, "Bob vision", NodeType::Vision).await?;

    let err = service
        .move_goal(ALICE, &goal.id, &bobs_vision.id, None)
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(store.list_edges_by_source(&goal.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_belongs_to_edge_moves_instead_of_adding_a_parent() -> Result<()> {
    let (store, service) = create_test_service();
    let v1 = create_node(&service, ALICE, "V1", NodeType::Vision).await?;
    let v2 = create_node(&service, ALICE, "V2", NodeType::Vision).await?;
    let goal = create_node(&service, ALICE, "G", NodeType::Goal).await?;
    service.move_goal(ALICE, &goal.id, &v1.id, None).await?;

    let edge = service
        .create_edge(ALICE, NewEdge::new(&goal.id, &v2.id, EdgeType::BelongsTo))
        .await?;
    assert_eq!(edge.target_id, v2.id);
    assert_eq!(edge.sort_order, Some(0));

    let parents: Vec<_> = store
        .list_edges_by_source(&goal.id)
        .await?
        .into_iter()
        .filter(|e| e.edge_type == EdgeType::BelongsTo)
        .collect();
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].target_id, v2.id);

    let tree = service.vision_tree(ALICE).await?;
    let goals_under = |vision_id: &str| {
        tree.iter()
            .find(|t| t.vision.id == vision_id)
            .map(|t| t.goals.len())
    };
    assert_eq!(goals_under(&v1.id), Some(0));
    assert_eq!(goals_under(&v2.id), Some(1));
    Ok(())
}

#[tokio::test]
async fn test_belongs_to_edge_requires_hierarchy_types() -> Result<()> {
    let (store, service) = create_test_service();
    let vision = create_node(&service, ALICE, "V", NodeType::Vision).await?;
    let person = create_node(&service, ALICE, "Ana", NodeType::Person).await?;
    let project = create_node(&service, ALICE, "P", NodeType::Project).await?;

    let err = service
        .create_edge(ALICE, NewEdge::new(&person.id, &vision.id, EdgeType::BelongsTo))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidState(_)));

    // A project belongs under a goal, not a vision
    let err = service
        .create_edge(ALICE, NewEdge::new(&project.id, &vision.id, EdgeType::BelongsTo))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidState(_)));
    assert!(store.list_edges_by_owner(ALICE).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_hierarchy_edge_sort_order_is_not_directly_editable() -> Result<()> {
    let (_store, service) = create_test_service();
    let vision = create_node(&service, ALICE, "V", NodeType::Vision).await?;
    let goal = create_node(&service, ALICE, "G", NodeType::Goal).await?;
    let edge = service.move_goal(ALICE, &goal.id, &vision.id, None).await?;

    let err = service
        .update_edge(ALICE, &edge.id, EdgeUpdate::new().with_sort_order(Some(7)))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidState(_)));

    let updated = service
        .update_edge(ALICE, &edge.id, EdgeUpdate::new().with_notes(Some("core".to_string())))
        .await?;
    assert_eq!(updated.sort_order, Some(0));
    Ok(())
}
