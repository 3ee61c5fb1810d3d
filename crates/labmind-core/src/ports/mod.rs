//! Ports for external collaborators.
//!
//! The registry and monitor depend only on [`ModelBackend`]; insight
//! generation above the knowledge graph depends only on [`LanguageModel`].
//! Neither port leaks a specific training library or provider — artifacts are
//! opaque blobs plus metadata, and every AI-backed call has a deterministic
//! in-process fallback (see [`crate::stubs`]).

mod language_model;
mod model_backend;

pub use language_model::LanguageModel;
pub use model_backend::{
    ModelArtifact, ModelBackend, TrainingConfig, TrainingDataset, TrainingOutcome,
};
