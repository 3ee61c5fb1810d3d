//! Error types for external-collaborator ports.
//!
//! Component crates define their own error enums; this module only covers the
//! ports that cross the process boundary (`ModelBackend`, `LanguageModel`).

use thiserror::Error;

/// Result alias for backend port operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Failures raised by external collaborators behind the core ports.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Training run failed inside the backend.
    #[error("training failed: {0}")]
    Training(String),

    /// Prediction failed inside the backend.
    #[error("prediction failed: {0}")]
    Prediction(String),

    /// The stored artifact could not be interpreted by the backend.
    #[error("malformed artifact ({content_type}): {reason}")]
    MalformedArtifact {
        /// Declared content type of the artifact.
        content_type: String,
        /// What failed while decoding it.
        reason: String,
    },

    /// The dataset cannot be used for training.
    #[error("unusable dataset: {0}")]
    UnusableDataset(String),

    /// The language-model provider failed or is unreachable.
    #[error("language model unavailable: {0}")]
    LanguageModel(String),
}
