//! Weighted shortest path over the graph snapshot.
//!
//! Edge cost is `1 / weight`: heavier (better-evidenced) edges are cheaper,
//! so the returned path prefers strong relationships. Traversal is
//! undirected — research relationships are informative in both directions.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use labmind_core::{EdgeId, NodeId};

use crate::repository::GraphSnapshot;

/// Classification of a found path by node count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    /// Two nodes or fewer: an immediate relationship.
    Direct,
    /// Up to four nodes: one or two intermediaries.
    Indirect,
    /// Longer chains.
    MultiHop,
}

impl PathKind {
    fn classify(node_count: usize) -> Self {
        match node_count {
            0..=2 => Self::Direct,
            3..=4 => Self::Indirect,
            _ => Self::MultiHop,
        }
    }
}

/// A found path with its total traversal cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedPath {
    /// Visited nodes, start to end inclusive.
    pub nodes: Vec<NodeId>,
    /// Edges taken, one fewer than nodes.
    pub edges: Vec<EdgeId>,
    /// Sum of `1 / weight` over the edges taken. 0.0 for the identity path.
    pub total_cost: f64,
    /// Direct / indirect / multi-hop classification.
    pub kind: PathKind,
}

/// Frontier entry ordered by smallest cost first.
struct Candidate {
    cost: f64,
    node: NodeId,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}
impl Eq for Candidate {}
impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert for min-cost extraction.
        other.cost.total_cmp(&self.cost)
    }
}

/// Cheapest path from `start` to `goal`; `None` when unreachable.
///
/// `start == goal` yields the single-node identity path with cost 0.
pub fn dijkstra_shortest_path(
    snapshot: &GraphSnapshot,
    start: NodeId,
    goal: NodeId,
) -> Option<WeightedPath> {
    if start == goal {
        return Some(WeightedPath {
            nodes: vec![start],
            edges: Vec::new(),
            total_cost: 0.0,
            kind: PathKind::Direct,
        });
    }

    let mut best_cost: HashMap<NodeId, f64> = HashMap::new();
    let mut parent: HashMap<NodeId, (NodeId, EdgeId)> = HashMap::new();
    let mut heap = BinaryHeap::new();

    best_cost.insert(start, 0.0);
    heap.push(Candidate {
        cost: 0.0,
        node: start,
    });

    while let Some(Candidate { cost, node }) = heap.pop() {
        if node == goal {
            return Some(reconstruct(&parent, start, goal, cost));
        }
        // Stale entry: a cheaper route to this node was already settled.
        if cost > *best_cost.get(&node).unwrap_or(&f64::INFINITY) {
            continue;
        }

        for &(edge_id, neighbor) in snapshot.neighbors(node) {
            let Some(edge) = snapshot.edges.get(&edge_id) else {
                continue;
            };
            let step = 1.0 / edge.weight.max(f64::EPSILON);
            let next_cost = cost + step;
            if next_cost < *best_cost.get(&neighbor).unwrap_or(&f64::INFINITY) {
                best_cost.insert(neighbor, next_cost);
                parent.insert(neighbor, (node, edge_id));
                heap.push(Candidate {
                    cost: next_cost,
                    node: neighbor,
                });
            }
        }
    }

    None
}

fn reconstruct(
    parent: &HashMap<NodeId, (NodeId, EdgeId)>,
    start: NodeId,
    goal: NodeId,
    total_cost: f64,
) -> WeightedPath {
    let mut nodes = vec![goal];
    let mut edges = Vec::new();
    let mut current = goal;
    while current != start {
        let &(prev, edge) = &parent[&current];
        nodes.push(prev);
        edges.push(edge);
        current = prev;
    }
    nodes.reverse();
    edges.reverse();
    let kind = PathKind::classify(nodes.len());
    WeightedPath {
        nodes,
        edges,
        total_cost,
        kind,
    }
}
