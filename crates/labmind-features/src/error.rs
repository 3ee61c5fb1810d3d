//! Error types for feature store operations.

use thiserror::Error;

use labmind_core::{GroupId, ViewId};

/// Result alias for feature store operations.
pub type FeatureResult<T> = Result<T, FeatureError>;

/// Failures raised by the feature store.
///
/// Drift over empty windows is NOT an error: it is reported through the
/// `insufficient_data` flag on the drift result so callers keep the partial
/// context.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Unknown feature group id.
    #[error("feature group not found: {0}")]
    GroupNotFound(GroupId),

    /// Unknown feature view id.
    #[error("feature view not found: {0}")]
    ViewNotFound(ViewId),

    /// A group with this name is already registered.
    #[error("feature group name already registered: {0}")]
    DuplicateGroupName(String),

    /// A view references a feature group that does not exist.
    #[error("view references unknown group: {0}")]
    UnknownGroupReference(GroupId),

    /// A batch vector violated the group schema. The whole batch is rejected.
    #[error("schema violation in group '{group}', entity '{entity}', feature '{feature}': {reason}")]
    SchemaViolation {
        /// Group whose schema was violated.
        group: String,
        /// Entity the offending vector belongs to.
        entity: String,
        /// Offending feature name.
        feature: String,
        /// What was wrong with the value.
        reason: String,
    },
}
