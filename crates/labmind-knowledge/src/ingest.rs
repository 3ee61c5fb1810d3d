//! Paper ingestion with fixed-vocabulary concept extraction.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::KnowledgeResult;
use crate::graph::KnowledgeGraph;
use crate::repository::GraphRepository;
use crate::types::{KnowledgeNode, NodeType, RelationType};
use crate::vocabulary;

/// Citation contribution scale: ln(1 + citations) * this.
const CITATION_SCALE: f64 = 0.5;

/// Bonus for appearing in a named journal.
const JOURNAL_BONUS: f64 = 0.5;

/// Recency bonus for papers at most two years old.
const RECENT_BONUS: f64 = 0.5;

/// Recency bonus for papers at most five years old.
const MODERATE_RECENT_BONUS: f64 = 0.25;

/// A paper to ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperInput {
    /// Paper title; becomes the node label.
    pub title: String,
    /// Author list.
    pub authors: Vec<String>,
    /// Abstract text, scanned for vocabulary terms.
    pub abstract_text: String,
    /// Author keywords, scanned for vocabulary terms.
    pub keywords: Vec<String>,
    /// Publishing journal, if known.
    pub journal: Option<String>,
    /// Publication year.
    pub year: i32,
    /// Citation count at ingestion time.
    pub citations: u32,
}

/// Result of ingesting one paper.
#[derive(Debug, Clone)]
pub struct PaperIngestion {
    /// The created paper node.
    pub paper: KnowledgeNode,
    /// Extracted nodes linked from the paper (new or re-used).
    pub concepts: Vec<KnowledgeNode>,
}

/// Initial weight of a paper node: citation-weighted with journal and
/// recency bonuses.
pub fn paper_weight(input: &PaperInput) -> f64 {
    let citation_component = f64::from(input.citations).ln_1p() * CITATION_SCALE;
    let journal_component = match &input.journal {
        Some(j) if !j.is_empty() => JOURNAL_BONUS,
        _ => 0.0,
    };
    let age_years = Utc::now().year() - input.year;
    let recency_component = if age_years <= 2 {
        RECENT_BONUS
    } else if age_years <= 5 {
        MODERATE_RECENT_BONUS
    } else {
        0.0
    };
    1.0 + citation_component + journal_component + recency_component
}

impl<R: GraphRepository> KnowledgeGraph<R> {
    /// Ingest a paper: create its node, extract vocabulary terms from the
    /// keywords and abstract, and link paper → term with a `uses` edge.
    ///
    /// Extracted terms deduplicate by exact (label, type) match: a repeated
    /// term increments the existing node's `frequency` property instead of
    /// creating a duplicate.
    pub async fn add_paper(&self, input: PaperInput) -> KnowledgeResult<PaperIngestion> {
        let _guard = self.write_lock.lock().await;

        let mut paper = KnowledgeNode::new(NodeType::Paper, &input.title, paper_weight(&input));
        paper.properties.insert(
            "authors".into(),
            serde_json::json!(input.authors.clone()),
        );
        paper.properties.insert(
            "keywords".into(),
            serde_json::json!(input.keywords.clone()),
        );
        if let Some(journal) = &input.journal {
            paper
                .properties
                .insert("journal".into(), serde_json::json!(journal));
        }
        paper
            .properties
            .insert("year".into(), serde_json::json!(input.year));
        paper
            .properties
            .insert("citations".into(), serde_json::json!(input.citations));
        self.repo.put_node(paper.clone()).await?;

        let mut concepts = Vec::new();
        for entry in vocabulary::matches(&input.keywords, &input.abstract_text) {
            let concept = match self.repo.node_by_label(entry.label, entry.node_type).await {
                Some(mut existing) => {
                    let frequency = existing
                        .properties
                        .get("frequency")
                        .and_then(|v| v.as_u64())
                        .unwrap_or(1);
                    existing
                        .properties
                        .insert("frequency".into(), serde_json::json!(frequency + 1));
                    existing.updated_at = Utc::now();
                    self.repo.put_node(existing.clone()).await?;
                    existing
                }
                None => {
                    let node = KnowledgeNode::new(entry.node_type, entry.label, 1.0)
                        .with_property("frequency", serde_json::json!(1));
                    self.repo.put_node(node.clone()).await?;
                    node
                }
            };

            self.link_locked(paper.id, concept.id, RelationType::Uses, None)
                .await?;
            // Re-read: the link bumped the concept's connectivity weight.
            concepts.push(self.repo.node(concept.id).await?);
        }

        info!(
            paper = %paper.label,
            weight = paper.weight,
            linked = concepts.len(),
            "paper ingested"
        );

        Ok(PaperIngestion { paper, concepts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryGraphRepository;
    use crate::types::CONNECTIVITY_INCREMENT;
    use std::sync::Arc;

    fn graph() -> KnowledgeGraph<InMemoryGraphRepository> {
        KnowledgeGraph::new(Arc::new(InMemoryGraphRepository::new()))
    }

    fn paper(title: &str, keywords: &[&str], abstract_text: &str) -> PaperInput {
        PaperInput {
            title: title.into(),
            authors: vec!["Kim, J.".into()],
            abstract_text: abstract_text.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            journal: Some("Bioresource Technology".into()),
            year: Utc::now().year() - 1,
            citations: 12,
        }
    }

    #[test]
    fn weight_combines_citations_journal_and_recency() {
        let input = paper("A", &[], "");
        let w = paper_weight(&input);
        // 1.0 + ln(13)*0.5 + 0.5 journal + 0.5 recent
        let expected = 1.0 + 13.0f64.ln() * 0.5 + 0.5 + 0.5;
        assert!((w - expected).abs() < 1e-9, "got {w}, expected {expected}");
    }

    #[test]
    fn old_uncited_preprint_gets_base_weight() {
        let input = PaperInput {
            title: "Old preprint".into(),
            authors: vec![],
            abstract_text: String::new(),
            keywords: vec![],
            journal: None,
            year: 1998,
            citations: 0,
        };
        assert!((paper_weight(&input) - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn ingestion_extracts_and_links_concepts() {
        let g = graph();
        let ingestion = g
            .add_paper(paper(
                "Enhanced power density in flow reactors",
                &["power density"],
                "Biofilm formation on carbon felt improved performance.",
            ))
            .await
            .expect("ingestion");

        assert_eq!(ingestion.concepts.len(), 3);
        assert_eq!(g.edge_count().await, 3);
        // Each of the three links bumped the paper's connectivity weight.
        let paper_after = g.get_node(ingestion.paper.id).await.expect("paper");
        let expected = ingestion.paper.weight + 3.0 * CONNECTIVITY_INCREMENT;
        assert!((paper_after.weight - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn repeated_concepts_increment_frequency_not_nodes() {
        let g = graph();
        g.add_paper(paper("First", &["power density"], ""))
            .await
            .expect("first");
        let second = g
            .add_paper(paper("Second", &["power density"], ""))
            .await
            .expect("second");

        // Two papers + one concept node, not two.
        assert_eq!(g.node_count().await, 3);
        let concept = &second.concepts[0];
        assert_eq!(
            concept.properties.get("frequency"),
            Some(&serde_json::json!(2))
        );
    }

    #[tokio::test]
    async fn dedup_is_per_label_and_type() {
        let g = graph();
        // "graphite" the material and a same-label concept added manually
        // are distinct nodes.
        g.add_node(NodeType::Concept, "graphite", Default::default())
            .await
            .expect("manual node");
        let ingestion = g
            .add_paper(paper("Third", &["graphite"], ""))
            .await
            .expect("ingest");
        assert_eq!(ingestion.concepts[0].node_type, NodeType::Material);
        assert_eq!(g.node_count().await, 3);
    }
}
