//! Knowledge graph node and edge types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use labmind_core::{EdgeId, NodeId, PropertyMap};

/// Weight added to both endpoints whenever a relationship touches them.
/// Node weight therefore grows with connectivity.
pub const CONNECTIVITY_INCREMENT: f64 = 0.1;

/// What a node represents in the research graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// A published paper.
    Paper,
    /// An extracted research concept.
    Concept,
    /// An experimental or computational method.
    Method,
    /// A material (electrode, membrane, substrate).
    Material,
    /// An organism or strain.
    Organism,
    /// An application domain.
    Application,
}

impl NodeType {
    /// All node type variants.
    pub fn all() -> [NodeType; 6] {
        [
            Self::Paper,
            Self::Concept,
            Self::Method,
            Self::Material,
            Self::Organism,
            Self::Application,
        ]
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Paper => "paper",
            Self::Concept => "concept",
            Self::Method => "method",
            Self::Material => "material",
            Self::Organism => "organism",
            Self::Application => "application",
        };
        write!(f, "{s}")
    }
}

/// Relationship carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// A paper uses a concept/method/material.
    Uses,
    /// A paper cites another paper.
    Cites,
    /// Source produces or yields target.
    Produces,
    /// Source improves target's performance.
    Improves,
    /// Source is inhibited or limited by target.
    InhibitedBy,
    /// Generic association.
    RelatedTo,
}

impl RelationType {
    /// Default edge weight for this relationship.
    ///
    /// Citation and usage links are well-evidenced; generic associations are
    /// weaker.
    pub fn default_weight(&self) -> f64 {
        match self {
            Self::Uses => 1.0,
            Self::Cites => 0.9,
            Self::Produces => 0.8,
            Self::Improves => 0.8,
            Self::InhibitedBy => 0.6,
            Self::RelatedTo => 0.5,
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uses => "uses",
            Self::Cites => "cites",
            Self::Produces => "produces",
            Self::Improves => "improves",
            Self::InhibitedBy => "inhibited_by",
            Self::RelatedTo => "related_to",
        };
        write!(f, "{s}")
    }
}

/// A typed node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeNode {
    /// Unique node id.
    pub id: NodeId,
    /// What the node represents.
    pub node_type: NodeType,
    /// Display label. (label, node_type) pairs are unique: ingestion
    /// deduplicates on exact match.
    pub label: String,
    /// Free-form properties (keywords, frequency, year, ...).
    pub properties: PropertyMap,
    /// Importance weight; grows with connectivity.
    pub weight: f64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeNode {
    /// Create a node with a fresh id.
    pub fn new(node_type: NodeType, label: impl Into<String>, weight: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            node_type,
            label: label.into(),
            properties: PropertyMap::new(),
            weight,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach a property (builder pattern).
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// A directed, weighted edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEdge {
    /// Unique edge id.
    pub id: EdgeId,
    /// Source node.
    pub source_id: NodeId,
    /// Target node.
    pub target_id: NodeId,
    /// Relationship type.
    pub relation: RelationType,
    /// Edge weight; traversal prefers heavier edges (cost = 1/weight).
    pub weight: f64,
    /// Free-form properties.
    pub properties: PropertyMap,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl KnowledgeEdge {
    /// Create an edge with the relation's default weight.
    pub fn new(source_id: NodeId, target_id: NodeId, relation: RelationType) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id,
            target_id,
            relation,
            weight: relation.default_weight(),
            properties: PropertyMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Create an edge with an explicit weight, clamped above zero so
    /// traversal costs stay finite.
    pub fn with_weight(
        source_id: NodeId,
        target_id: NodeId,
        relation: RelationType,
        weight: f64,
    ) -> Self {
        let mut edge = Self::new(source_id, target_id, relation);
        edge.weight = weight.max(f64::EPSILON);
        edge
    }

    /// The endpoint opposite `node`, if `node` is an endpoint at all.
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.source_id == node {
            Some(self.target_id)
        } else if self.target_id == node {
            Some(self.source_id)
        } else {
            None
        }
    }
}
