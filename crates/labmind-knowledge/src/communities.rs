//! Community detection by label propagation.
//!
//! Every node starts carrying its own label; each sweep lets a node adopt
//! the majority label among its neighbors, ties retaining the current
//! label. Propagation stops early on a sweep with no change and is capped at
//! ten sweeps. Converged labelings are a fixed point: re-running changes
//! nothing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use labmind_core::NodeId;

use crate::repository::GraphSnapshot;
use crate::types::NodeType;

/// Sweep cap; label propagation converges in a handful of sweeps on graphs
/// of this scale.
const MAX_ITERATIONS: usize = 10;

/// Fraction of members (by weight) reported as central.
const CENTRAL_FRACTION: f64 = 0.2;

/// A detected community.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    /// Stable id for this detection run.
    pub id: Uuid,
    /// Member nodes.
    pub member_ids: Vec<NodeId>,
    /// Top members by weight (the top 20%, at least one).
    pub central_nodes: Vec<NodeId>,
    /// Representative concept label, or the most common paper keyword.
    pub theme: Option<String>,
    /// Internal edge density: internal-edges / (n·(n−1)).
    pub coherence: f64,
}

impl Community {
    /// Number of members.
    pub fn size(&self) -> usize {
        self.member_ids.len()
    }
}

/// One propagation sweep over nodes in sorted-id order. Returns whether any
/// label changed.
fn sweep(snapshot: &GraphSnapshot, order: &[NodeId], labels: &mut HashMap<NodeId, NodeId>) -> bool {
    let mut changed = false;

    for &node in order {
        let mut counts: HashMap<NodeId, usize> = HashMap::new();
        for &(_, neighbor) in snapshot.neighbors(node) {
            if let Some(&label) = labels.get(&neighbor) {
                *counts.entry(label).or_insert(0) += 1;
            }
        }
        let Some(&max_count) = counts.values().max() else {
            continue; // isolated node keeps its own label
        };

        let current = labels[&node];
        let mut winners: Vec<NodeId> = counts
            .iter()
            .filter(|(_, &c)| c == max_count)
            .map(|(&l, _)| l)
            .collect();
        winners.sort();

        // A unique majority is adopted. A tie that includes the current
        // label retains it; otherwise the smallest winner is taken so the
        // sweep stays deterministic and distinct starting labels can still
        // coalesce.
        let adopted = if winners.len() == 1 {
            winners[0]
        } else if winners.contains(&current) {
            current
        } else {
            winners[0]
        };

        if adopted != current {
            labels.insert(node, adopted);
            changed = true;
        }
    }

    changed
}

/// Run label propagation to convergence (or the sweep cap) and return the
/// final labeling.
fn propagate(snapshot: &GraphSnapshot) -> HashMap<NodeId, NodeId> {
    let mut order: Vec<NodeId> = snapshot.nodes.keys().copied().collect();
    order.sort();

    let mut labels: HashMap<NodeId, NodeId> =
        order.iter().map(|&id| (id, id)).collect();

    for _ in 0..MAX_ITERATIONS {
        if !sweep(snapshot, &order, &mut labels) {
            break;
        }
    }
    labels
}

/// Detect communities and annotate each with central nodes, a theme, and a
/// coherence score. Singleton groups are dropped.
pub fn identify_communities(snapshot: &GraphSnapshot) -> Vec<Community> {
    let labels = propagate(snapshot);

    let mut groups: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for (&node, &label) in &labels {
        groups.entry(label).or_default().push(node);
    }

    let mut communities: Vec<Community> = groups
        .into_values()
        .filter(|members| members.len() > 1)
        .map(|mut members| {
            members.sort();
            let central_nodes = central_members(snapshot, &members);
            let theme = community_theme(snapshot, &members);
            let coherence = coherence(snapshot, &members);
            Community {
                id: Uuid::new_v4(),
                member_ids: members,
                central_nodes,
                theme,
                coherence,
            }
        })
        .collect();

    // Largest communities first.
    communities.sort_by_key(|c| std::cmp::Reverse(c.size()));
    communities
}

/// Top members by weight: the top 20%, at least one.
fn central_members(snapshot: &GraphSnapshot, members: &[NodeId]) -> Vec<NodeId> {
    let mut by_weight: Vec<NodeId> = members.to_vec();
    by_weight.sort_by(|a, b| {
        let wa = snapshot.nodes.get(a).map(|n| n.weight).unwrap_or(0.0);
        let wb = snapshot.nodes.get(b).map(|n| n.weight).unwrap_or(0.0);
        wb.total_cmp(&wa)
    });
    let keep = ((members.len() as f64 * CENTRAL_FRACTION).ceil() as usize).max(1);
    by_weight.truncate(keep);
    by_weight
}

/// Representative concept label, falling back to the most common keyword of
/// the community's papers.
fn community_theme(snapshot: &GraphSnapshot, members: &[NodeId]) -> Option<String> {
    let best_concept = members
        .iter()
        .filter_map(|id| snapshot.nodes.get(id))
        .filter(|n| n.node_type == NodeType::Concept)
        .max_by(|a, b| a.weight.total_cmp(&b.weight));
    if let Some(concept) = best_concept {
        return Some(concept.label.clone());
    }

    let mut keyword_counts: HashMap<String, usize> = HashMap::new();
    for node in members
        .iter()
        .filter_map(|id| snapshot.nodes.get(id))
        .filter(|n| n.node_type == NodeType::Paper)
    {
        if let Some(keywords) = node.properties.get("keywords").and_then(|v| v.as_array()) {
            for keyword in keywords.iter().filter_map(|k| k.as_str()) {
                *keyword_counts.entry(keyword.to_lowercase()).or_insert(0) += 1;
            }
        }
    }
    keyword_counts
        .into_iter()
        .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then_with(|| kb.cmp(ka)))
        .map(|(keyword, _)| keyword)
}

/// Internal edge density over directed pairs.
fn coherence(snapshot: &GraphSnapshot, members: &[NodeId]) -> f64 {
    let n = members.len();
    if n < 2 {
        return 0.0;
    }
    let member_set: std::collections::HashSet<NodeId> = members.iter().copied().collect();
    let internal = snapshot
        .edges
        .values()
        .filter(|e| member_set.contains(&e.source_id) && member_set.contains(&e.target_id))
        .count();
    internal as f64 / (n * (n - 1)) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{GraphRepository, InMemoryGraphRepository};
    use crate::types::{KnowledgeEdge, KnowledgeNode, RelationType};

    /// Two dense triangles joined by one weak bridge.
    async fn two_cluster_snapshot() -> GraphSnapshot {
        let repo = InMemoryGraphRepository::new();
        let nodes: Vec<KnowledgeNode> = (0..6)
            .map(|i| KnowledgeNode::new(NodeType::Concept, format!("c{i}"), 1.0 + i as f64 * 0.1))
            .collect();
        for n in &nodes {
            repo.put_node(n.clone()).await.expect("node");
        }
        let triangle = |a: usize, b: usize, c: usize| {
            vec![(a, b), (b, c), (a, c)]
        };
        let mut pairs = triangle(0, 1, 2);
        pairs.extend(triangle(3, 4, 5));
        pairs.push((2, 3)); // bridge
        for (a, b) in pairs {
            repo.put_edge(KnowledgeEdge::new(
                nodes[a].id,
                nodes[b].id,
                RelationType::RelatedTo,
            ))
            .await
            .expect("edge");
        }
        repo.snapshot().await
    }

    /// Star around node 0: converges within two sweeps for any id order.
    async fn star_snapshot() -> GraphSnapshot {
        let repo = InMemoryGraphRepository::new();
        let nodes: Vec<KnowledgeNode> = (0..4)
            .map(|i| KnowledgeNode::new(NodeType::Concept, format!("c{i}"), 1.0))
            .collect();
        for n in &nodes {
            repo.put_node(n.clone()).await.expect("node");
        }
        for n in &nodes[1..] {
            repo.put_edge(KnowledgeEdge::new(nodes[0].id, n.id, RelationType::RelatedTo))
                .await
                .expect("edge");
        }
        repo.snapshot().await
    }

    #[tokio::test]
    async fn converged_labeling_is_a_fixed_point() {
        let snapshot = star_snapshot().await;
        let mut order: Vec<NodeId> = snapshot.nodes.keys().copied().collect();
        order.sort();

        let mut labels = propagate(&snapshot);
        let before = labels.clone();
        let changed = sweep(&snapshot, &order, &mut labels);
        assert!(!changed, "a converged labeling must not change");
        assert_eq!(labels, before);
    }

    #[tokio::test]
    async fn singleton_groups_are_dropped() {
        let repo = InMemoryGraphRepository::new();
        let lonely = KnowledgeNode::new(NodeType::Concept, "isolated", 1.0);
        repo.put_node(lonely).await.expect("node");
        let communities = identify_communities(&repo.snapshot().await);
        assert!(communities.is_empty());
    }

    #[tokio::test]
    async fn connected_cluster_forms_one_community() {
        let communities = identify_communities(&star_snapshot().await);
        assert_eq!(communities.len(), 1);
        assert_eq!(communities[0].size(), 4);
    }

    #[tokio::test]
    async fn dense_clusters_yield_nonempty_communities() {
        let communities = identify_communities(&two_cluster_snapshot().await);
        assert!(!communities.is_empty());
        let covered: usize = communities.iter().map(Community::size).sum();
        assert!(covered >= 3, "at least one triangle must coalesce");
    }

    #[tokio::test]
    async fn central_nodes_are_top_weighted_fifth() {
        let snapshot = two_cluster_snapshot().await;
        let communities = identify_communities(&snapshot);
        for community in &communities {
            assert!(!community.central_nodes.is_empty());
            assert!(community.central_nodes.len() <= community.size());
            // The heaviest member must be central.
            let heaviest = community
                .member_ids
                .iter()
                .max_by(|a, b| {
                    snapshot.nodes[a].weight.total_cmp(&snapshot.nodes[b].weight)
                })
                .unwrap();
            assert_eq!(community.central_nodes[0], *heaviest);
        }
    }

    #[tokio::test]
    async fn coherence_reflects_internal_density() {
        let snapshot = two_cluster_snapshot().await;
        let communities = identify_communities(&snapshot);
        for community in communities {
            assert!(community.coherence > 0.0);
            assert!(community.coherence <= 1.0);
        }
    }

    #[tokio::test]
    async fn theme_prefers_concept_labels() {
        let snapshot = two_cluster_snapshot().await;
        let communities = identify_communities(&snapshot);
        for community in communities {
            let theme = community.theme.expect("concept communities have themes");
            assert!(theme.starts_with('c'));
        }
    }
}
