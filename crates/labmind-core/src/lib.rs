//! labmind core library
//!
//! Shared foundations for the labmind workspace:
//!
//! - Id aliases and common value types (`PropertyMap`, `MetricMap`, `TimeWindow`)
//! - Ports for external collaborators (`ModelBackend`, `LanguageModel`)
//! - Deterministic in-process stubs for those ports
//! - Telemetry initialization for binaries and tests
//!
//! Component crates (`labmind-features`, `labmind-registry`, `labmind-monitor`,
//! `labmind-knowledge`, `labmind-workflow`) each own their entities and expose
//! their operations behind repository ports; this crate carries only what is
//! shared between them. Cross-component references are by id only.

pub mod error;
pub mod ids;
pub mod ports;
pub mod stubs;
pub mod telemetry;
pub mod types;

pub use error::{BackendError, BackendResult};
pub use ids::{
    AlertId, EdgeId, EntityId, GroupId, InsightId, JobId, ModelId, NodeId, StepId, ViewId,
    WorkflowId,
};
pub use ports::{
    LanguageModel, ModelArtifact, ModelBackend, TrainingConfig, TrainingDataset, TrainingOutcome,
};
pub use types::{MetricMap, PropertyMap, TimeWindow};
