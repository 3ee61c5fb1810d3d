//! Id aliases shared across the workspace.
//!
//! Every entity is addressed by a UUID v4. Components reference each other's
//! entities by id only, never by embedded value, so ownership stays acyclic.

use uuid::Uuid;

/// Identifier for a registered model version.
pub type ModelId = Uuid;

/// Identifier for a training job.
pub type JobId = Uuid;

/// Identifier for a feature group.
pub type GroupId = Uuid;

/// Identifier for a feature view.
pub type ViewId = Uuid;

/// Identifier for an entity tracked by the feature store (a reactor,
/// an electrode batch, an organism strain).
pub type EntityId = String;

/// Identifier for a knowledge-graph node.
pub type NodeId = Uuid;

/// Identifier for a knowledge-graph edge.
pub type EdgeId = Uuid;

/// Identifier for a workflow.
pub type WorkflowId = Uuid;

/// Identifier for a workflow step.
pub type StepId = Uuid;

/// Identifier for a monitoring alert.
pub type AlertId = Uuid;

/// Identifier for a generated insight.
pub type InsightId = Uuid;
