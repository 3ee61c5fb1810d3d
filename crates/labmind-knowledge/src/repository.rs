//! Storage port for the knowledge graph, plus the in-memory adapter.
//!
//! Mutations go through the port; algorithms (paths, communities, insights)
//! run over an immutable [`GraphSnapshot`] so they stay pure functions and
//! never hold storage locks while computing.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use labmind_core::{EdgeId, NodeId};

use crate::error::{KnowledgeError, KnowledgeResult};
use crate::types::{KnowledgeEdge, KnowledgeNode, NodeType};

/// Immutable copy of the graph for algorithm passes.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    /// All nodes by id.
    pub nodes: HashMap<NodeId, KnowledgeNode>,
    /// All edges by id.
    pub edges: HashMap<EdgeId, KnowledgeEdge>,
    /// Undirected adjacency: node -> (edge, neighbor) pairs, both directions.
    pub adjacency: HashMap<NodeId, Vec<(EdgeId, NodeId)>>,
}

impl GraphSnapshot {
    /// Neighbors of a node (empty for unknown or isolated nodes).
    pub fn neighbors(&self, node: NodeId) -> &[(EdgeId, NodeId)] {
        self.adjacency
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Undirected degree of a node.
    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    /// Nodes of one type.
    pub fn nodes_of_type(&self, node_type: NodeType) -> Vec<&KnowledgeNode> {
        self.nodes
            .values()
            .filter(|n| n.node_type == node_type)
            .collect()
    }
}

/// Storage port for nodes and edges.
#[async_trait]
pub trait GraphRepository: Send + Sync {
    /// Insert or replace a node.
    async fn put_node(&self, node: KnowledgeNode) -> KnowledgeResult<()>;

    /// Fetch a node by id.
    async fn node(&self, id: NodeId) -> KnowledgeResult<KnowledgeNode>;

    /// Find a node by exact (label, type) match — the ingestion dedup key.
    async fn node_by_label(&self, label: &str, node_type: NodeType) -> Option<KnowledgeNode>;

    /// Insert an edge. Endpoint existence is the service's concern.
    async fn put_edge(&self, edge: KnowledgeEdge) -> KnowledgeResult<()>;

    /// Node count.
    async fn node_count(&self) -> usize;

    /// Edge count.
    async fn edge_count(&self) -> usize;

    /// Immutable snapshot of the whole graph.
    async fn snapshot(&self) -> GraphSnapshot;
}

/// In-memory [`GraphRepository`] over concurrent maps with a locked
/// adjacency index.
#[derive(Debug, Default)]
pub struct InMemoryGraphRepository {
    nodes: DashMap<NodeId, KnowledgeNode>,
    edges: DashMap<EdgeId, KnowledgeEdge>,
    adjacency: RwLock<HashMap<NodeId, Vec<(EdgeId, NodeId)>>>,
}

impl InMemoryGraphRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphRepository for InMemoryGraphRepository {
    async fn put_node(&self, node: KnowledgeNode) -> KnowledgeResult<()> {
        self.nodes.insert(node.id, node);
        Ok(())
    }

    async fn node(&self, id: NodeId) -> KnowledgeResult<KnowledgeNode> {
        self.nodes
            .get(&id)
            .map(|n| n.value().clone())
            .ok_or(KnowledgeError::NodeNotFound(id))
    }

    async fn node_by_label(&self, label: &str, node_type: NodeType) -> Option<KnowledgeNode> {
        self.nodes
            .iter()
            .find(|n| n.node_type == node_type && n.label == label)
            .map(|n| n.value().clone())
    }

    async fn put_edge(&self, edge: KnowledgeEdge) -> KnowledgeResult<()> {
        let mut adjacency = self.adjacency.write();
        adjacency
            .entry(edge.source_id)
            .or_default()
            .push((edge.id, edge.target_id));
        adjacency
            .entry(edge.target_id)
            .or_default()
            .push((edge.id, edge.source_id));
        drop(adjacency);
        self.edges.insert(edge.id, edge);
        Ok(())
    }

    async fn node_count(&self) -> usize {
        self.nodes.len()
    }

    async fn edge_count(&self) -> usize {
        self.edges.len()
    }

    async fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect(),
            adjacency: self.adjacency.read().clone(),
        }
    }
}
