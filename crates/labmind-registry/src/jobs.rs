//! Training job records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use labmind_core::{JobId, MetricMap, ModelId};

/// Lifecycle of a training job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, not yet started.
    Pending,
    /// Running inside a spawned task.
    Running,
    /// Finished; metrics recorded on the job and its model version.
    Completed,
    /// Failed; the error is in the log tail.
    Failed,
}

impl JobStatus {
    /// Whether the job can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A long-running training run for one model version.
///
/// Progress moves through [0, 1]; log lines are ordered and append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingJob {
    /// Unique job id.
    pub id: JobId,
    /// The model version this job trains.
    pub model_id: ModelId,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Completion fraction in [0, 1].
    pub progress: f32,
    /// Hyperparameters the run was started with.
    pub hyperparameters: HashMap<String, serde_json::Value>,
    /// Metrics reported by the backend on completion.
    pub metrics: Option<MetricMap>,
    /// Ordered log lines.
    pub logs: Vec<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl TrainingJob {
    /// Create a pending job.
    pub fn new(model_id: ModelId, hyperparameters: HashMap<String, serde_json::Value>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            model_id,
            status: JobStatus::Pending,
            progress: 0.0,
            hyperparameters,
            metrics: None,
            logs: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a log line and clamp progress into [0, 1].
    pub fn record(&mut self, progress: f32, line: impl Into<String>) {
        self.progress = progress.clamp(0.0, 1.0);
        self.logs.push(line.into());
        self.updated_at = Utc::now();
    }
}
