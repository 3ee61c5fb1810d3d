//! Closed-form linear backend used when no external trainer is wired in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{BackendError, BackendResult};
use crate::ports::{ModelArtifact, ModelBackend, TrainingConfig, TrainingDataset, TrainingOutcome};
use crate::types::MetricMap;

/// Content type tag written into artifacts produced by [`NaiveModelBackend`].
pub const NAIVE_MODEL_CONTENT_TYPE: &str = "application/vnd.labmind.naive-linear+json";

/// Serialized form of the fitted model. Opaque outside this backend.
#[derive(Debug, Serialize, Deserialize)]
struct NaiveModel {
    feature_names: Vec<String>,
    intercept: f64,
    /// Per-feature univariate OLS slope, averaged at prediction time.
    slopes: Vec<f64>,
    /// Training-time column means; predictions center inputs with these.
    feature_means: Vec<f64>,
}

/// Deterministic in-process [`ModelBackend`].
///
/// Fits one univariate ordinary-least-squares slope per feature against the
/// target and predicts with the average of the per-feature estimates. No
/// randomness, no iteration: the same dataset always yields the same
/// artifact, which is what the orchestrator and registry tests need from a
/// fallback collaborator.
#[derive(Debug, Default)]
pub struct NaiveModelBackend;

impl NaiveModelBackend {
    /// Create the backend.
    pub fn new() -> Self {
        Self
    }

    fn fit(dataset: &TrainingDataset) -> Result<NaiveModel, BackendError> {
        let n = dataset.len();
        if n == 0 {
            return Err(BackendError::UnusableDataset("empty dataset".into()));
        }
        if dataset.targets.len() != n {
            return Err(BackendError::UnusableDataset(format!(
                "{} rows but {} targets",
                n,
                dataset.targets.len()
            )));
        }
        let width = dataset.feature_names.len();
        if let Some(bad) = dataset.rows.iter().position(|r| r.len() != width) {
            return Err(BackendError::UnusableDataset(format!(
                "row {} has {} values, expected {}",
                bad,
                dataset.rows[bad].len(),
                width
            )));
        }

        let target_mean = dataset.targets.iter().sum::<f64>() / n as f64;

        let mut slopes = Vec::with_capacity(width);
        let mut feature_means = Vec::with_capacity(width);
        for col in 0..width {
            let col_mean = dataset.rows.iter().map(|r| r[col]).sum::<f64>() / n as f64;
            let mut cov = 0.0;
            let mut var = 0.0;
            for (row, &y) in dataset.rows.iter().zip(&dataset.targets) {
                let dx = row[col] - col_mean;
                cov += dx * (y - target_mean);
                var += dx * dx;
            }
            // Constant column carries no signal; its slope is zero.
            slopes.push(if var > 0.0 { cov / var } else { 0.0 });
            feature_means.push(col_mean);
        }

        Ok(NaiveModel {
            feature_names: dataset.feature_names.clone(),
            intercept: target_mean,
            slopes,
            feature_means,
        })
    }

    fn predict_row(model: &NaiveModel, row: &[f64]) -> f64 {
        if model.slopes.is_empty() {
            return model.intercept;
        }
        let mut acc = 0.0;
        for (i, slope) in model.slopes.iter().enumerate() {
            acc += model.intercept + slope * (row[i] - model.feature_means[i]);
        }
        acc / model.slopes.len() as f64
    }

    fn evaluate(model: &NaiveModel, dataset: &TrainingDataset) -> MetricMap {
        let n = dataset.len() as f64;
        let target_mean = dataset.targets.iter().sum::<f64>() / n;
        let target_range = {
            let min = dataset.targets.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = dataset
                .targets
                .iter()
                .cloned()
                .fold(f64::NEG_INFINITY, f64::max);
            max - min
        };

        let mut sse = 0.0;
        let mut sae = 0.0;
        let mut sst = 0.0;
        let mut within = 0usize;
        let tolerance = if target_range > 0.0 {
            0.1 * target_range
        } else {
            f64::EPSILON
        };

        for (row, &y) in dataset.rows.iter().zip(&dataset.targets) {
            let pred = Self::predict_row(model, row);
            let err = pred - y;
            sse += err * err;
            sae += err.abs();
            sst += (y - target_mean) * (y - target_mean);
            if err.abs() <= tolerance {
                within += 1;
            }
        }

        let mut metrics = MetricMap::new();
        metrics.insert("mse".into(), sse / n);
        metrics.insert("mae".into(), sae / n);
        metrics.insert(
            "r2".into(),
            if sst > 0.0 { 1.0 - sse / sst } else { 1.0 },
        );
        // Fraction of predictions landing within 10% of the target range.
        metrics.insert("accuracy".into(), within as f64 / n);
        metrics
    }

    fn decode(artifact: &ModelArtifact) -> BackendResult<NaiveModel> {
        if artifact.content_type != NAIVE_MODEL_CONTENT_TYPE {
            return Err(BackendError::MalformedArtifact {
                content_type: artifact.content_type.clone(),
                reason: "not a naive-linear artifact".into(),
            });
        }
        serde_json::from_slice(&artifact.bytes).map_err(|e| BackendError::MalformedArtifact {
            content_type: artifact.content_type.clone(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ModelBackend for NaiveModelBackend {
    async fn train(
        &self,
        _config: &TrainingConfig,
        dataset: &TrainingDataset,
    ) -> BackendResult<TrainingOutcome> {
        let model = Self::fit(dataset)?;
        let metrics = Self::evaluate(&model, dataset);
        debug!(
            rows = dataset.len(),
            features = model.slopes.len(),
            "naive backend fitted linear model"
        );

        let bytes = serde_json::to_vec(&model)
            .map_err(|e| BackendError::Training(format!("artifact encoding failed: {e}")))?;
        let mut artifact = ModelArtifact::new(bytes, NAIVE_MODEL_CONTENT_TYPE);
        artifact
            .metadata
            .insert("trainer".into(), "naive-linear".into());
        artifact
            .metadata
            .insert("rows".into(), dataset.len().to_string());

        Ok(TrainingOutcome { artifact, metrics })
    }

    async fn predict(
        &self,
        artifact: &ModelArtifact,
        input: &serde_json::Value,
    ) -> BackendResult<serde_json::Value> {
        let model = Self::decode(artifact)?;

        let row: Vec<f64> = match input {
            serde_json::Value::Array(values) => values
                .iter()
                .map(|v| {
                    v.as_f64().ok_or_else(|| {
                        BackendError::Prediction("non-numeric value in input array".into())
                    })
                })
                .collect::<Result<_, _>>()?,
            serde_json::Value::Object(map) => model
                .feature_names
                .iter()
                .map(|name| {
                    map.get(name).and_then(|v| v.as_f64()).ok_or_else(|| {
                        BackendError::Prediction(format!("missing numeric feature '{name}'"))
                    })
                })
                .collect::<Result<_, _>>()?,
            _ => {
                return Err(BackendError::Prediction(
                    "input must be an array or an object of features".into(),
                ))
            }
        };

        if row.len() != model.slopes.len() {
            return Err(BackendError::Prediction(format!(
                "expected {} features, got {}",
                model.slopes.len(),
                row.len()
            )));
        }

        let prediction = Self::predict_row(&model, &row);
        Ok(serde_json::json!({ "prediction": prediction }))
    }
}
