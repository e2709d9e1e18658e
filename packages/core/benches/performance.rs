//! Performance benchmarks for Compass core operations
//!
//! Run with: `cargo bench -p compass-core`
//!
//! These benchmarks measure critical path performance:
//! - Goal path suggestions over synthetic networks (pure BFS and via the service)
//! - Proximity reports for high-degree nodes
//! - Similarity ranking over embedded people

use compass_core::algorithms::{
    find_goal_paths, proximity_report, rank_by_similarity, AdjacencyIndex,
};
use compass_core::config::InfluenceWeights;
use compass_core::db::{GraphStore, InMemoryGraphStore, MutationBatch};
use compass_core::services::GraphService;
use compass_core::{Edge, EdgeType, Node};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;

const OWNER: &str = "bench-owner";

/// Generate a goal plus `people` persons wired in a ring with chords
///
/// Every tenth person supports the goal; everyone knows the next person and
/// the one seven places ahead, so BFS fans out quickly.
fn generate_network(people: usize) -> (Node, Vec<Node>, Vec<Edge>) {
    let goal = Node::goal(OWNER, "Benchmark goal");
    let mut nodes = vec![goal.clone()];
    for i in 0..people {
        nodes.push(
            Node::person(OWNER, format!("Person {}", i))
                .with_relationship_strength((i % 6) as u8),
        );
    }

    let mut edges = Vec::new();
    for i in 0..people {
        let person = &nodes[i + 1];
        if i % 10 == 0 {
            edges.push(
                Edge::new(OWNER, &person.id, &goal.id, EdgeType::Supports)
                    .with_weight((i % 5) as i64 + 1),
            );
        }
        for step in [1, 7] {
            let other = &nodes[(i + step) % people + 1];
            if other.id != person.id {
                edges.push(
                    Edge::new(OWNER, &person.id, &other.id, EdgeType::Knows)
                        .with_weight(((i + step) % 4) as i64 + 1),
                );
            }
        }
    }

    (goal, nodes, edges)
}

/// Benchmark pure path finding at several network sizes
///
/// Target: < 5ms for 5,000 people at depth 3
fn bench_path_finding(c: &mut Criterion) {
    let mut group = c.benchmark_group("goal_path_suggestions");

    for size in [100, 1_000, 5_000] {
        let (goal, nodes, edges) = generate_network(size);
        let index = AdjacencyIndex::build(&nodes, &edges);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(find_goal_paths(&index, &goal.id, 3, 20)));
        });
    }

    group.finish();
}

/// Benchmark the full service path: load, index, search
fn bench_service_path_finding(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (goal, nodes, edges) = generate_network(1_000);

    let store = Arc::new(InMemoryGraphStore::new());
    rt.block_on(async {
        let mut batch = MutationBatch::new();
        for node in nodes {
            batch = batch.save_node(node);
        }
        for edge in edges {
            batch = batch.save_edge(edge);
        }
        store.apply_batch(batch).await.unwrap();
    });
    let service = GraphService::new(store);

    c.bench_function("service_goal_path_suggestions_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(
                    service
                        .goal_path_suggestions(OWNER, &goal.id, Some(3), 20)
                        .await
                        .unwrap(),
                )
            })
        });
    });
}

/// Benchmark proximity on the most connected node of a star
fn bench_proximity(c: &mut Criterion) {
    let hub = Node::person(OWNER, "Hub");
    let mut nodes = vec![hub.clone()];
    let mut edges = Vec::new();
    for i in 0..2_000 {
        let leaf = Node::person(OWNER, format!("Leaf {}", i));
        edges.push(
            Edge::new(OWNER, &hub.id, &leaf.id, EdgeType::Knows)
                .with_weight((i % 5) as i64)
                .with_relationship_strength((i % 6) as u8),
        );
        nodes.push(leaf);
    }
    let index = AdjacencyIndex::build(&nodes, &edges);
    let weights = InfluenceWeights::default();

    c.bench_function("proximity_report_2000_neighbors", |b| {
        b.iter(|| black_box(proximity_report(&index, &hub.id, &weights)));
    });
}

/// Benchmark cosine ranking of 10,000 people with 384-dimensional embeddings
fn bench_similarity(c: &mut Criterion) {
    const DIMENSIONS: usize = 384;
    let target: Vec<f32> = (0..DIMENSIONS).map(|d| (d as f32 * 0.37).sin()).collect();
    let people: Vec<Node> = (0..10_000)
        .map(|i| {
            let embedding = (0..DIMENSIONS)
                .map(|d| ((d * (i % 17 + 1)) as f32 * 0.11).cos())
                .collect();
            Node::person(OWNER, format!("Person {}", i)).with_embedding(embedding)
        })
        .collect();

    let mut group = c.benchmark_group("similarity");
    group.sample_size(20);
    group.bench_function("rank_10000_people", |b| {
        b.iter(|| black_box(rank_by_similarity(&target, &people, 10)));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_path_finding,
    bench_service_path_finding,
    bench_proximity,
    bench_similarity
);
criterion_main!(benches);
