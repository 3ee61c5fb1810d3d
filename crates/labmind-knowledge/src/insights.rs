//! Insight generation: key concepts, emerging connections, research gaps.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use labmind_core::{InsightId, NodeId};

use crate::graph::KnowledgeGraph;
use crate::repository::{GraphRepository, GraphSnapshot};
use crate::types::NodeType;

/// Kinds of generated insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    /// A node whose connectivity makes it load-bearing for the field.
    KeyConcept,
    /// A relationship created recently enough to be a new development.
    EmergingConnection,
    /// A pair of concepts with no short path between them — an unexplored
    /// combination.
    ResearchGap,
}

/// Tunable bounds for insight generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightConfig {
    /// How many highest-degree nodes become key-concept insights.
    pub max_key_concepts: usize,
    /// Edges younger than this many days count as emerging.
    pub emerging_window_days: i64,
    /// Most recent emerging connections reported.
    pub max_emerging: usize,
    /// Concept pairs further apart than this hop count are gaps.
    pub gap_max_hops: usize,
    /// The gap scan considers only the heaviest N concepts. The all-pairs
    /// scan is quadratic; this cap keeps it bounded on large graphs.
    pub max_gap_candidates: usize,
    /// Gap insights reported.
    pub max_gaps: usize,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            max_key_concepts: 5,
            emerging_window_days: 365,
            max_emerging: 10,
            gap_max_hops: 3,
            max_gap_candidates: 64,
            max_gaps: 10,
        }
    }
}

/// A generated insight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    /// Unique insight id.
    pub id: InsightId,
    /// Kind of finding.
    pub kind: InsightKind,
    /// Short headline.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Nodes the insight concerns.
    pub node_ids: Vec<NodeId>,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Generation time.
    pub created_at: DateTime<Utc>,
}

fn insight(
    kind: InsightKind,
    title: String,
    description: String,
    node_ids: Vec<NodeId>,
    confidence: f64,
) -> Insight {
    Insight {
        id: Uuid::new_v4(),
        kind,
        title,
        description,
        node_ids,
        confidence,
        created_at: Utc::now(),
    }
}

/// Generate all insight kinds over a snapshot.
pub fn generate_insights(snapshot: &GraphSnapshot, config: &InsightConfig) -> Vec<Insight> {
    let mut insights = key_concepts(snapshot, config);
    insights.extend(emerging_connections(snapshot, config));
    insights.extend(research_gaps(snapshot, config));
    insights
}

/// Highest-degree nodes; confidence grows with degree, capped at 0.9.
fn key_concepts(snapshot: &GraphSnapshot, config: &InsightConfig) -> Vec<Insight> {
    let mut ranked: Vec<(&crate::types::KnowledgeNode, usize)> = snapshot
        .nodes
        .values()
        .map(|n| (n, snapshot.degree(n.id)))
        .filter(|(_, degree)| *degree > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
    ranked.truncate(config.max_key_concepts);

    ranked
        .into_iter()
        .map(|(node, degree)| {
            insight(
                InsightKind::KeyConcept,
                format!("'{}' is a hub in the current literature", node.label),
                format!(
                    "{} '{}' connects {} other entities, making it central to the field.",
                    node.node_type, node.label, degree
                ),
                vec![node.id],
                (degree as f64 / 20.0).min(0.9),
            )
        })
        .collect()
}

/// Edges created within the emerging window, newest first.
fn emerging_connections(snapshot: &GraphSnapshot, config: &InsightConfig) -> Vec<Insight> {
    let cutoff = Utc::now() - Duration::days(config.emerging_window_days);
    let mut recent: Vec<&crate::types::KnowledgeEdge> = snapshot
        .edges
        .values()
        .filter(|e| e.created_at >= cutoff)
        .collect();
    recent.sort_by_key(|e| std::cmp::Reverse(e.created_at));
    recent.truncate(config.max_emerging);

    recent
        .into_iter()
        .filter_map(|edge| {
            let source = snapshot.nodes.get(&edge.source_id)?;
            let target = snapshot.nodes.get(&edge.target_id)?;
            Some(insight(
                InsightKind::EmergingConnection,
                format!("New link: '{}' {} '{}'", source.label, edge.relation, target.label),
                format!(
                    "A {} relationship between '{}' and '{}' appeared recently; it may signal a developing research direction.",
                    edge.relation, source.label, target.label
                ),
                vec![edge.source_id, edge.target_id],
                0.6,
            ))
        })
        .collect()
}

/// Concept pairs with no path within `gap_max_hops`.
///
/// Candidates are the heaviest concepts, capped, because the pair scan is
/// quadratic. The per-pair reachability check is a depth-limited BFS.
fn research_gaps(snapshot: &GraphSnapshot, config: &InsightConfig) -> Vec<Insight> {
    let mut concepts: Vec<&crate::types::KnowledgeNode> = snapshot
        .nodes_of_type(NodeType::Concept)
        .into_iter()
        .collect();
    concepts.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.id.cmp(&b.id)));
    concepts.truncate(config.max_gap_candidates);

    let mut gaps = Vec::new();
    'outer: for (i, a) in concepts.iter().enumerate() {
        for b in concepts.iter().skip(i + 1) {
            if !reachable_within(snapshot, a.id, b.id, config.gap_max_hops) {
                gaps.push(insight(
                    InsightKind::ResearchGap,
                    format!("Unexplored: '{}' × '{}'", a.label, b.label),
                    format!(
                        "Concepts '{}' and '{}' share no connection within {} hops; combining them may be an open research direction.",
                        a.label, b.label, config.gap_max_hops
                    ),
                    vec![a.id, b.id],
                    0.5,
                ));
                if gaps.len() >= config.max_gaps {
                    break 'outer;
                }
            }
        }
    }
    gaps
}

/// Depth-limited BFS reachability.
fn reachable_within(snapshot: &GraphSnapshot, from: NodeId, to: NodeId, max_hops: usize) -> bool {
    if from == to {
        return true;
    }
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut frontier: VecDeque<(NodeId, usize)> = VecDeque::new();
    visited.insert(from);
    frontier.push_back((from, 0));

    while let Some((node, depth)) = frontier.pop_front() {
        if depth >= max_hops {
            continue;
        }
        for &(_, neighbor) in snapshot.neighbors(node) {
            if neighbor == to {
                return true;
            }
            if visited.insert(neighbor) {
                frontier.push_back((neighbor, depth + 1));
            }
        }
    }
    false
}

impl<R: GraphRepository> KnowledgeGraph<R> {
    /// Narrate an insight as prose.
    ///
    /// Goes through the configured [`labmind_core::LanguageModel`]; when the
    /// provider fails, falls back to the deterministic description already on
    /// the insight, so narration never depends on an external service being
    /// up.
    pub async fn narrate_insight(&self, insight: &Insight) -> String {
        let prompt = format!(
            "Summarize this research finding for a lab newsletter: {} — {}",
            insight.title, insight.description
        );
        match self.language_model.answer_query(&prompt).await {
            Ok(answer) => answer,
            Err(_) => insight.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryGraphRepository};
    use crate::types::{KnowledgeEdge, KnowledgeNode, RelationType};
    use std::sync::Arc;

    async fn hub_snapshot() -> GraphSnapshot {
        let repo = InMemoryGraphRepository::new();
        let hub = KnowledgeNode::new(NodeType::Concept, "power density", 2.0);
        repo.put_node(hub.clone()).await.expect("hub");
        for i in 0..6 {
            let leaf = KnowledgeNode::new(NodeType::Paper, format!("paper {i}"), 1.0);
            repo.put_node(leaf.clone()).await.expect("leaf");
            repo.put_edge(KnowledgeEdge::new(leaf.id, hub.id, RelationType::Uses))
                .await
                .expect("edge");
        }
        repo.snapshot().await
    }

    #[tokio::test]
    async fn key_concepts_rank_by_degree_with_capped_confidence() {
        let snapshot = hub_snapshot().await;
        let insights = key_concepts(&snapshot, &InsightConfig::default());
        assert!(!insights.is_empty());
        let top = &insights[0];
        assert_eq!(top.kind, InsightKind::KeyConcept);
        assert!(top.title.contains("power density"));
        // Hub degree 6 -> confidence 0.3.
        assert!((top.confidence - 0.3).abs() < 1e-9);
        assert!(insights.iter().all(|i| i.confidence <= 0.9));
    }

    #[tokio::test]
    async fn fresh_edges_are_emerging_connections() {
        let snapshot = hub_snapshot().await;
        let insights = emerging_connections(&snapshot, &InsightConfig::default());
        // All edges were just created.
        assert_eq!(insights.len(), 6);
        assert!(insights
            .iter()
            .all(|i| i.kind == InsightKind::EmergingConnection));
    }

    #[tokio::test]
    async fn old_edges_are_not_emerging() {
        let repo = InMemoryGraphRepository::new();
        let a = KnowledgeNode::new(NodeType::Concept, "a", 1.0);
        let b = KnowledgeNode::new(NodeType::Concept, "b", 1.0);
        repo.put_node(a.clone()).await.expect("a");
        repo.put_node(b.clone()).await.expect("b");
        let mut edge = KnowledgeEdge::new(a.id, b.id, RelationType::RelatedTo);
        edge.created_at = Utc::now() - Duration::days(400);
        repo.put_edge(edge).await.expect("edge");

        let insights = emerging_connections(&repo.snapshot().await, &InsightConfig::default());
        assert!(insights.is_empty());
    }

    #[tokio::test]
    async fn disconnected_concepts_form_research_gaps() {
        let repo = InMemoryGraphRepository::new();
        let a = KnowledgeNode::new(NodeType::Concept, "electron transfer", 2.0);
        let b = KnowledgeNode::new(NodeType::Concept, "desalination", 2.0);
        repo.put_node(a.clone()).await.expect("a");
        repo.put_node(b.clone()).await.expect("b");

        let gaps = research_gaps(&repo.snapshot().await, &InsightConfig::default());
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].kind, InsightKind::ResearchGap);
        assert_eq!(gaps[0].node_ids.len(), 2);
    }

    #[tokio::test]
    async fn linked_concepts_are_not_gaps() {
        let repo = InMemoryGraphRepository::new();
        let a = KnowledgeNode::new(NodeType::Concept, "a", 1.0);
        let b = KnowledgeNode::new(NodeType::Concept, "b", 1.0);
        repo.put_node(a.clone()).await.expect("a");
        repo.put_node(b.clone()).await.expect("b");
        repo.put_edge(KnowledgeEdge::new(a.id, b.id, RelationType::RelatedTo))
            .await
            .expect("edge");

        let gaps = research_gaps(&repo.snapshot().await, &InsightConfig::default());
        assert!(gaps.is_empty());
    }

    #[tokio::test]
    async fn gap_scan_respects_candidate_cap() {
        let repo = InMemoryGraphRepository::new();
        for i in 0..8 {
            repo.put_node(KnowledgeNode::new(
                NodeType::Concept,
                format!("c{i}"),
                1.0,
            ))
            .await
            .expect("node");
        }
        let config = InsightConfig {
            max_gap_candidates: 2,
            ..Default::default()
        };
        // Two candidates -> at most one pair.
        let gaps = research_gaps(&repo.snapshot().await, &config);
        assert_eq!(gaps.len(), 1);
    }

    #[tokio::test]
    async fn narration_falls_back_deterministically() {
        let graph = crate::graph::KnowledgeGraph::new(Arc::new(InMemoryGraphRepository::new()));
        let finding = insight(
            InsightKind::KeyConcept,
            "t".into(),
            "electron transfer links six studies".into(),
            vec![],
            0.5,
        );
        let first = graph.narrate_insight(&finding).await;
        let second = graph.narrate_insight(&finding).await;
        assert_eq!(first, second, "narration must be deterministic");
        assert!(!first.is_empty());
    }
}
