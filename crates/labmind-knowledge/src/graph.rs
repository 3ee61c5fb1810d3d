//! The knowledge graph service.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use labmind_core::stubs::LexicalLanguageModel;
use labmind_core::{LanguageModel, NodeId, PropertyMap};

use crate::communities::{identify_communities, Community};
use crate::error::{KnowledgeError, KnowledgeResult};
use crate::insights::{generate_insights, Insight, InsightConfig};
use crate::paths::{dijkstra_shortest_path, WeightedPath};
use crate::related::{related_within, RelatedNode};
use crate::repository::{GraphRepository, GraphSnapshot};
use crate::types::{
    KnowledgeEdge, KnowledgeNode, NodeType, RelationType, CONNECTIVITY_INCREMENT,
};

/// Knowledge graph service: typed mutations plus the query surface.
///
/// Mutations are serialized through one writer lock — graph writes are rare
/// next to reads, and a single writer keeps label-dedup and weight updates
/// race-free. Queries never take the writer lock; they run over an immutable
/// snapshot.
pub struct KnowledgeGraph<R: GraphRepository> {
    pub(crate) repo: Arc<R>,
    pub(crate) language_model: Arc<dyn LanguageModel>,
    pub(crate) write_lock: Mutex<()>,
}

impl<R: GraphRepository> KnowledgeGraph<R> {
    /// Create a graph with the deterministic lexical narration fallback.
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            language_model: Arc::new(LexicalLanguageModel::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Use an external language model for narration. Narration still falls
    /// back to the deterministic template when the provider fails.
    #[must_use]
    pub fn with_language_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.language_model = model;
        self
    }

    /// Add a typed node with initial weight 1.0.
    pub async fn add_node(
        &self,
        node_type: NodeType,
        label: &str,
        properties: PropertyMap,
    ) -> KnowledgeResult<KnowledgeNode> {
        let _guard = self.write_lock.lock().await;
        let mut node = KnowledgeNode::new(node_type, label, 1.0);
        node.properties = properties;
        self.repo.put_node(node.clone()).await?;
        debug!(%node.id, node_type = %node.node_type, label = %node.label, "node added");
        Ok(node)
    }

    /// Fetch a node by id.
    pub async fn get_node(&self, id: NodeId) -> KnowledgeResult<KnowledgeNode> {
        self.repo.node(id).await
    }

    /// Add a relationship between two existing nodes.
    ///
    /// Both endpoints gain [`CONNECTIVITY_INCREMENT`] weight: a node's
    /// importance grows with its connectivity.
    ///
    /// # Errors
    ///
    /// `EndpointMissing` when either endpoint does not exist.
    pub async fn add_relationship(
        &self,
        source_id: NodeId,
        target_id: NodeId,
        relation: RelationType,
        weight: Option<f64>,
    ) -> KnowledgeResult<KnowledgeEdge> {
        let _guard = self.write_lock.lock().await;
        self.link_locked(source_id, target_id, relation, weight).await
    }

    /// Insert an edge and bump endpoint weights. Caller holds the writer
    /// lock.
    pub(crate) async fn link_locked(
        &self,
        source_id: NodeId,
        target_id: NodeId,
        relation: RelationType,
        weight: Option<f64>,
    ) -> KnowledgeResult<KnowledgeEdge> {
        let mut source = self
            .repo
            .node(source_id)
            .await
            .map_err(|_| KnowledgeError::EndpointMissing(source_id))?;
        let mut target = self
            .repo
            .node(target_id)
            .await
            .map_err(|_| KnowledgeError::EndpointMissing(target_id))?;

        let edge = match weight {
            Some(w) => KnowledgeEdge::with_weight(source_id, target_id, relation, w),
            None => KnowledgeEdge::new(source_id, target_id, relation),
        };
        self.repo.put_edge(edge.clone()).await?;

        source.weight += CONNECTIVITY_INCREMENT;
        source.updated_at = chrono::Utc::now();
        self.repo.put_node(source).await?;

        target.weight += CONNECTIVITY_INCREMENT;
        target.updated_at = chrono::Utc::now();
        self.repo.put_node(target).await?;

        debug!(%edge.id, relation = %edge.relation, "relationship added");
        Ok(edge)
    }

    /// Number of nodes.
    pub async fn node_count(&self) -> usize {
        self.repo.node_count().await
    }

    /// Number of edges.
    pub async fn edge_count(&self) -> usize {
        self.repo.edge_count().await
    }

    /// Immutable snapshot for external analysis.
    pub async fn snapshot(&self) -> GraphSnapshot {
        self.repo.snapshot().await
    }

    /// Cheapest path between two nodes, where edge cost = 1/weight (heavier
    /// edges are preferred). `None` when unreachable.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` when either endpoint does not exist.
    pub async fn find_shortest_path(
        &self,
        from: NodeId,
        to: NodeId,
    ) -> KnowledgeResult<Option<WeightedPath>> {
        self.repo.node(from).await?;
        self.repo.node(to).await?;
        let snapshot = self.repo.snapshot().await;
        Ok(dijkstra_shortest_path(&snapshot, from, to))
    }

    /// Nodes reachable within `max_distance` hops, annotated with their
    /// relation-type path, sorted by distance ascending.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` when the start node does not exist.
    pub async fn find_related_concepts(
        &self,
        start: NodeId,
        max_distance: usize,
    ) -> KnowledgeResult<Vec<RelatedNode>> {
        self.repo.node(start).await?;
        let snapshot = self.repo.snapshot().await;
        Ok(related_within(&snapshot, start, max_distance))
    }

    /// Detect communities by label propagation.
    pub async fn identify_communities(&self) -> Vec<Community> {
        let snapshot = self.repo.snapshot().await;
        let communities = identify_communities(&snapshot);
        info!(count = communities.len(), "communities identified");
        communities
    }

    /// Generate insights: key concepts, emerging connections, research gaps.
    pub async fn generate_insights(&self, config: &InsightConfig) -> Vec<Insight> {
        let snapshot = self.repo.snapshot().await;
        let insights = generate_insights(&snapshot, config);
        info!(count = insights.len(), "insights generated");
        insights
    }
}
