//! labmind model registry
//!
//! Tracks model version lifecycle: registration with auto-incremented major
//! versions, atomic promotion to production, metric comparison, filtered
//! search, and asynchronous training jobs driven through the
//! [`labmind_core::ModelBackend`] port.
//!
//! The production invariant — at most one production version per model name —
//! is enforced by serializing every status mutation for a name behind a
//! per-name lock. Promotion demotes before it promotes, so no observer ever
//! sees two production versions.

pub mod compare;
pub mod error;
pub mod jobs;
pub mod registry;
pub mod repository;
pub mod types;

pub use compare::{MetricComparison, ModelComparison, Winner};
pub use error::{RegistryError, RegistryResult};
pub use jobs::{JobStatus, TrainingJob};
pub use registry::{ModelRegistry, ModelSearchQuery, RegisterModel};
pub use repository::{InMemoryModelRepository, ModelRepository};
pub use types::{ModelKind, ModelStatus, ModelVersion, SemanticVersion};
