//! Error types for monitor operations.

use thiserror::Error;

use labmind_core::{AlertId, ModelId};

/// Result alias for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Failures raised by the monitor.
///
/// Only structural problems surface here; monitoring conditions (breaches,
/// anomalies, drift) are recorded as alerts, and thin drift windows are
/// flagged on the report.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No predictions have ever been recorded for this model.
    #[error("model is not tracked by the monitor: {0}")]
    ModelNotTracked(ModelId),

    /// Unknown alert id.
    #[error("alert not found: {0}")]
    AlertNotFound(AlertId),
}
