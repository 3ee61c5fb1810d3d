//! Error types for knowledge graph operations.

use thiserror::Error;

use labmind_core::NodeId;

/// Result alias for knowledge graph operations.
pub type KnowledgeResult<T> = Result<T, KnowledgeError>;

/// Failures raised by the knowledge graph.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Unknown node id.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A relationship referenced an endpoint that does not exist.
    #[error("relationship endpoint does not exist: {0}")]
    EndpointMissing(NodeId),
}
