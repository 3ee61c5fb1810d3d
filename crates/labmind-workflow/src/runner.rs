//! The step-runner port.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use labmind_core::{StepId, WorkflowId};

use crate::types::WorkflowStep;

/// Outputs a completed step publishes to its dependents.
pub type StepOutputs = HashMap<String, serde_json::Value>;

/// Why a step attempt failed. Attempts are retried up to the executor's
/// budget; the final failure's reason surfaces in `StepFailed`.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StepFailure(pub String);

impl StepFailure {
    /// Wrap any displayable error.
    pub fn from_error(err: impl std::fmt::Display) -> Self {
        Self(err.to_string())
    }
}

/// Everything a runner gets for one attempt.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// The executing workflow.
    pub workflow_id: WorkflowId,
    /// The step being run (carries `config`).
    pub step: WorkflowStep,
    /// Outputs of this step's dependencies, by dependency id.
    pub upstream: HashMap<StepId, StepOutputs>,
    /// Pause signal. Long-running runners should poll
    /// [`StepContext::is_cancelled`] at natural checkpoints and return early;
    /// the executor also cancels the attempt at its own checkpoint.
    pub cancel: watch::Receiver<bool>,
}

impl StepContext {
    /// Whether a pause was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// First upstream output with the given key, in dependency order of the
    /// upstream map. Convenience for single-producer keys like `model_id`.
    pub fn upstream_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.upstream.values().find_map(|outputs| outputs.get(key))
    }
}

/// One step type's execution strategy.
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Run one attempt. Retried by the executor on failure, within budget.
    async fn run(&self, ctx: StepContext) -> Result<StepOutputs, StepFailure>;
}
