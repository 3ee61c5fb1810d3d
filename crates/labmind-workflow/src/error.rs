//! Error types for workflow orchestration.

use thiserror::Error;

use labmind_core::{StepId, WorkflowId};

use crate::types::{StepType, WorkflowStatus};

/// Result alias for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Failures raised by the orchestrator.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Unknown workflow id.
    #[error("workflow not found: {0}")]
    WorkflowNotFound(WorkflowId),

    /// A step declared a dependency on an id outside the step set.
    #[error("step '{step}' depends on unknown step {dependency}")]
    UnknownDependency {
        /// Step carrying the bad reference.
        step: String,
        /// The id that matched no step.
        dependency: StepId,
    },

    /// The dependency graph contains a cycle. Raised before any step runs.
    #[error("workflow dependency cycle: {}", cycle.join(" -> "))]
    CircularDependency {
        /// Step names along the cycle, first repeated at the end.
        cycle: Vec<String>,
    },

    /// The operation is not valid for the workflow's current status.
    #[error("workflow {workflow} is {status:?}; cannot {operation}")]
    InvalidState {
        /// Workflow concerned.
        workflow: WorkflowId,
        /// Its current status.
        status: WorkflowStatus,
        /// What was attempted.
        operation: &'static str,
    },

    /// No runner is registered for a step type in the workflow.
    #[error("no runner registered for step type {0}")]
    NoRunner(StepType),

    /// A step exhausted its retry budget on failures.
    #[error("step '{step}' failed after {attempts} attempts: {reason}")]
    StepFailed {
        /// Failing step name.
        step: String,
        /// Attempts consumed.
        attempts: u32,
        /// Last failure reason.
        reason: String,
    },

    /// A step exhausted its retry budget on timeouts.
    #[error("step '{step}' timed out after {attempts} attempts")]
    StepTimeout {
        /// Timing-out step name.
        step: String,
        /// Attempts consumed.
        attempts: u32,
    },
}
