//! Error types for registry operations.

use thiserror::Error;

use labmind_core::{BackendError, JobId, ModelId};

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Failures raised by the model registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Unknown model version id.
    #[error("model version not found: {0}")]
    ModelNotFound(ModelId),

    /// Unknown training job id.
    #[error("training job not found: {0}")]
    JobNotFound(JobId),

    /// The model backend rejected a training or prediction call.
    #[error(transparent)]
    Backend(#[from] BackendError),
}
