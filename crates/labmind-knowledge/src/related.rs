//! Breadth-limited neighborhood traversal.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use labmind_core::NodeId;

use crate::repository::GraphSnapshot;
use crate::types::{NodeType, RelationType};

/// A node reached within the distance limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedNode {
    /// The reached node.
    pub node_id: NodeId,
    /// Its label.
    pub label: String,
    /// Its type.
    pub node_type: NodeType,
    /// Hops from the start node.
    pub distance: usize,
    /// Relation types along the discovery path, start to node.
    pub relation_path: Vec<RelationType>,
}

/// Nodes reachable within `max_distance` hops of `start`, sorted by distance
/// ascending. The start node itself is excluded. Each hit carries the
/// relation-type path of its BFS discovery route.
pub fn related_within(
    snapshot: &GraphSnapshot,
    start: NodeId,
    max_distance: usize,
) -> Vec<RelatedNode> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut frontier: VecDeque<(NodeId, usize)> = VecDeque::new();
    let mut paths: HashMap<NodeId, Vec<RelationType>> = HashMap::new();
    let mut results = Vec::new();

    visited.insert(start);
    frontier.push_back((start, 0));
    paths.insert(start, Vec::new());

    while let Some((node, distance)) = frontier.pop_front() {
        if distance >= max_distance {
            continue;
        }
        let base_path = paths.get(&node).cloned().unwrap_or_default();

        for &(edge_id, neighbor) in snapshot.neighbors(node) {
            if visited.contains(&neighbor) {
                continue;
            }
            let Some(edge) = snapshot.edges.get(&edge_id) else {
                continue;
            };
            visited.insert(neighbor);

            let mut relation_path = base_path.clone();
            relation_path.push(edge.relation);
            paths.insert(neighbor, relation_path.clone());
            frontier.push_back((neighbor, distance + 1));

            if let Some(reached) = snapshot.nodes.get(&neighbor) {
                results.push(RelatedNode {
                    node_id: neighbor,
                    label: reached.label.clone(),
                    node_type: reached.node_type,
                    distance: distance + 1,
                    relation_path,
                });
            }
        }
    }

    // BFS emits in frontier order already; make the distance ordering
    // explicit and stable for callers.
    results.sort_by_key(|r| r.distance);
    results
}
