//! Benchmarks for the snapshot-based graph algorithms.

use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use labmind_knowledge::{
    communities::identify_communities, paths::dijkstra_shortest_path, GraphRepository,
    GraphSnapshot, InMemoryGraphRepository, KnowledgeEdge, KnowledgeNode, NodeType, RelationType,
};

/// Ring of clusters: `clusters` dense groups of `size`, chained by bridges.
fn build_snapshot(clusters: usize, size: usize) -> (GraphSnapshot, uuid::Uuid, uuid::Uuid) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    runtime.block_on(async {
        let repo = Arc::new(InMemoryGraphRepository::new());
        let mut all = Vec::new();
        for c in 0..clusters {
            let mut members = Vec::new();
            for i in 0..size {
                let node =
                    KnowledgeNode::new(NodeType::Concept, format!("c{c}-{i}"), 1.0 + i as f64);
                repo.put_node(node.clone()).await.expect("node");
                members.push(node);
            }
            for pair in members.windows(2) {
                repo.put_edge(KnowledgeEdge::new(
                    pair[0].id,
                    pair[1].id,
                    RelationType::RelatedTo,
                ))
                .await
                .expect("edge");
            }
            all.push(members);
        }
        for pair in all.windows(2) {
            repo.put_edge(KnowledgeEdge::new(
                pair[0][0].id,
                pair[1][0].id,
                RelationType::RelatedTo,
            ))
            .await
            .expect("bridge");
        }
        let start = all.first().expect("clusters")[0].id;
        let goal = all.last().expect("clusters")[size - 1].id;
        (repo.snapshot().await, start, goal)
    })
}

fn bench_communities(c: &mut Criterion) {
    let (snapshot, _, _) = build_snapshot(8, 25);
    c.bench_function("label_propagation_200_nodes", |b| {
        b.iter(|| identify_communities(&snapshot))
    });
}

fn bench_shortest_path(c: &mut Criterion) {
    let (snapshot, start, goal) = build_snapshot(8, 25);
    c.bench_function("dijkstra_across_bridges", |b| {
        b.iter(|| dijkstra_shortest_path(&snapshot, start, goal))
    });
}

criterion_group!(benches, bench_communities, bench_shortest_path);
criterion_main!(benches);
