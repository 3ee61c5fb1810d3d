//! Model backend port: training and prediction behind an opaque artifact.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::BackendResult;
use crate::types::MetricMap;

/// Opaque trained-model artifact.
///
/// The registry stores this without interpreting the bytes; only the backend
/// that produced it knows the format. `content_type` lets a backend reject
/// artifacts it does not understand instead of misreading them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Serialized model, format known only to the producing backend.
    pub bytes: Vec<u8>,
    /// MIME-style tag identifying the producing backend's format.
    pub content_type: String,
    /// Free-form key/value metadata (training host, library version, ...).
    pub metadata: HashMap<String, String>,
}

impl ModelArtifact {
    /// Create an artifact from raw bytes and a content type.
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            metadata: HashMap::new(),
        }
    }

    /// Artifact size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Hyperparameters and bounds for one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Named hyperparameters, backend-interpreted.
    pub hyperparameters: HashMap<String, serde_json::Value>,
    /// Upper bound on training epochs/passes.
    pub max_epochs: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hyperparameters: HashMap::new(),
            max_epochs: 10,
        }
    }
}

/// A tabular training dataset: one row per observation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingDataset {
    /// Column names, aligned with each row of `rows`.
    pub feature_names: Vec<String>,
    /// Feature rows; every row must have `feature_names.len()` values.
    pub rows: Vec<Vec<f64>>,
    /// Target value per row.
    pub targets: Vec<f64>,
}

impl TrainingDataset {
    /// Number of observations.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the dataset has no observations.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// What a backend returns from a completed training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingOutcome {
    /// The trained artifact, opaque to callers.
    pub artifact: ModelArtifact,
    /// Evaluation metrics computed by the backend (accuracy, mse, ...).
    pub metrics: MetricMap,
}

/// External model-training/serving collaborator.
///
/// The registry and monitor depend on this interface only, never on a
/// concrete tensor library. Implementations must be safe to call from
/// concurrent tasks.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Train a model and return the artifact plus its evaluation metrics.
    async fn train(
        &self,
        config: &TrainingConfig,
        dataset: &TrainingDataset,
    ) -> BackendResult<TrainingOutcome>;

    /// Run one prediction against a previously produced artifact.
    async fn predict(
        &self,
        artifact: &ModelArtifact,
        input: &serde_json::Value,
    ) -> BackendResult<serde_json::Value>;
}
