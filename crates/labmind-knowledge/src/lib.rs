//! labmind knowledge graph
//!
//! Typed node/edge store for research knowledge — papers, concepts, methods,
//! materials, organisms, applications — with weighted path queries,
//! breadth-limited neighborhood traversal, label-propagation community
//! detection, and insight generation.
//!
//! # Architecture
//!
//! - [`types`] — nodes, edges, relation types
//! - [`repository`] — storage port plus the in-memory adapter; algorithms
//!   work over an immutable [`repository::GraphSnapshot`]
//! - [`graph`] — the `KnowledgeGraph` service (mutations + queries)
//! - [`ingest`] — paper ingestion with fixed-vocabulary concept extraction
//! - [`paths`] / [`related`] — Dijkstra shortest path, BFS neighborhoods
//! - [`communities`] — label propagation
//! - [`insights`] — key concepts, emerging connections, research gaps
//!
//! Insight narration can go through the [`labmind_core::LanguageModel`] port;
//! every narration has a deterministic non-AI fallback, so the provider is
//! strictly optional.

pub mod communities;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod insights;
pub mod paths;
pub mod related;
pub mod repository;
pub mod types;
pub mod vocabulary;

pub use communities::Community;
pub use error::{KnowledgeError, KnowledgeResult};
pub use graph::KnowledgeGraph;
pub use ingest::{PaperIngestion, PaperInput};
pub use insights::{Insight, InsightConfig, InsightKind};
pub use paths::{PathKind, WeightedPath};
pub use related::RelatedNode;
pub use repository::{GraphRepository, GraphSnapshot, InMemoryGraphRepository};
pub use types::{KnowledgeEdge, KnowledgeNode, NodeType, RelationType};
