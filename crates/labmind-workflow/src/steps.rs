//! Built-in step runners delegating to the component crates.
//!
//! Each runner interprets its step's `config` and the outputs of upstream
//! steps, so a data-prep → training → evaluation → deployment → monitoring
//! chain composes through the outputs map alone.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use labmind_core::{ModelArtifact, ModelId, TimeWindow, TrainingConfig, TrainingDataset};
use labmind_features::{FeatureRepository, FeatureStore};
use labmind_monitor::{ModelMonitor, MonitorError};
use labmind_registry::{JobStatus, ModelKind, ModelRegistry, ModelRepository, RegisterModel};

use crate::runner::{StepContext, StepFailure, StepOutputs, StepRunner};
use crate::types::StepType;

/// Poll interval while waiting on a training job.
const JOB_POLL_INTERVAL: Duration = Duration::from_millis(25);

fn config_str(ctx: &StepContext, key: &str) -> Result<String, StepFailure> {
    ctx.step
        .config
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .ok_or_else(|| StepFailure(format!("config is missing string field '{key}'")))
}

fn config_uuid(ctx: &StepContext, key: &str) -> Result<Uuid, StepFailure> {
    let raw = config_str(ctx, key)?;
    Uuid::parse_str(&raw).map_err(|e| StepFailure(format!("config field '{key}': {e}")))
}

/// Model id from config, or from any upstream step's `model_id` output.
fn resolve_model_id(ctx: &StepContext) -> Result<ModelId, StepFailure> {
    if ctx.step.config.get("model_id").is_some() {
        return config_uuid(ctx, "model_id");
    }
    ctx.upstream_value("model_id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| StepFailure("no model_id in config or upstream outputs".into()))
}

/// Assembles a [`TrainingDataset`] from the feature store.
///
/// Config: `view_id`, `entity_ids`, `feature_names`, `target`. Entities
/// missing the target or any listed feature are skipped rather than failing
/// the step; the dataset row count reports what survived.
pub struct DataPreparationRunner<R: FeatureRepository> {
    store: Arc<FeatureStore<R>>,
}

impl<R: FeatureRepository> DataPreparationRunner<R> {
    /// Create the runner over a feature store.
    pub fn new(store: Arc<FeatureStore<R>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<R: FeatureRepository + 'static> StepRunner for DataPreparationRunner<R> {
    async fn run(&self, ctx: StepContext) -> Result<StepOutputs, StepFailure> {
        let view_id = config_uuid(&ctx, "view_id")?;
        let target = config_str(&ctx, "target")?;
        let entity_ids: Vec<String> = ctx
            .step
            .config
            .get("entity_ids")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .ok_or_else(|| StepFailure("config is missing 'entity_ids'".into()))?;
        let feature_names: Vec<String> = ctx
            .step
            .config
            .get("feature_names")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .ok_or_else(|| StepFailure("config is missing 'feature_names'".into()))?;

        let online = self
            .store
            .get_online_features(view_id, &entity_ids)
            .await
            .map_err(StepFailure::from_error)?;

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for features in &online {
            let target_value = features.values.get(&target).and_then(|v| v.as_number());
            let row: Option<Vec<f64>> = feature_names
                .iter()
                .map(|name| features.values.get(name).and_then(|v| v.as_number()))
                .collect();
            if let (Some(target_value), Some(row)) = (target_value, row) {
                rows.push(row);
                targets.push(target_value);
            }
        }
        if rows.is_empty() {
            return Err(StepFailure(
                "no entity had complete features and a target value".into(),
            ));
        }

        let dataset = TrainingDataset {
            feature_names,
            rows,
            targets,
        };
        debug!(rows = dataset.len(), "dataset assembled");
        Ok(HashMap::from([
            ("dataset".to_string(), serde_json::to_value(&dataset).map_err(StepFailure::from_error)?),
            ("row_count".to_string(), json!(dataset.len())),
        ]))
    }
}

/// Registers a model version and drives a training job to completion.
///
/// Config: `model_name`, `kind`, `framework`; the dataset arrives from an
/// upstream data-preparation step's `dataset` output.
pub struct TrainingRunner<R: ModelRepository> {
    registry: ModelRegistry<R>,
}

impl<R: ModelRepository> TrainingRunner<R> {
    /// Create the runner over a registry.
    pub fn new(registry: ModelRegistry<R>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl<R: ModelRepository + 'static> StepRunner for TrainingRunner<R> {
    async fn run(&self, ctx: StepContext) -> Result<StepOutputs, StepFailure> {
        let name = config_str(&ctx, "model_name")?;
        let kind: ModelKind = ctx
            .step
            .config
            .get("kind")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(StepFailure::from_error)?
            .unwrap_or(ModelKind::Regression);
        let framework = config_str(&ctx, "framework").unwrap_or_else(|_| "naive-linear".into());

        let dataset: TrainingDataset = ctx
            .upstream_value("dataset")
            .or_else(|| ctx.step.config.get("dataset"))
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(StepFailure::from_error)?
            .ok_or_else(|| StepFailure("no dataset in upstream outputs or config".into()))?;

        let model = self
            .registry
            .register_model(RegisterModel {
                name,
                kind,
                framework,
                artifact: ModelArtifact::new(Vec::new(), "application/x-untrained"),
                metrics: Default::default(),
                metadata: HashMap::from([(
                    "workflow_id".to_string(),
                    ctx.workflow_id.to_string(),
                )]),
            })
            .await
            .map_err(StepFailure::from_error)?;

        let job_id = self
            .registry
            .start_training(model.id, TrainingConfig::default(), dataset)
            .await
            .map_err(StepFailure::from_error)?;

        // The step budget bounds this wait; the pause signal is checked so a
        // cooperative cancel does not sit in the poll loop.
        loop {
            if ctx.is_cancelled() {
                return Err(StepFailure("cancelled while awaiting training job".into()));
            }
            let job = self
                .registry
                .get_job(job_id)
                .await
                .map_err(StepFailure::from_error)?;
            match job.status {
                JobStatus::Completed => {
                    let metrics = job.metrics.unwrap_or_default();
                    return Ok(HashMap::from([
                        ("model_id".to_string(), json!(model.id.to_string())),
                        ("job_id".to_string(), json!(job_id.to_string())),
                        ("metrics".to_string(), json!(metrics)),
                    ]));
                }
                JobStatus::Failed => {
                    let reason = job
                        .logs
                        .last()
                        .cloned()
                        .unwrap_or_else(|| "training failed".into());
                    return Err(StepFailure(reason));
                }
                JobStatus::Pending | JobStatus::Running => {
                    tokio::time::sleep(JOB_POLL_INTERVAL).await;
                }
            }
        }
    }
}

/// Reads a trained version's metrics and optionally gates on them.
///
/// Config: optional `min_accuracy` gate and optional `baseline_id` to
/// compare against.
pub struct EvaluationRunner<R: ModelRepository> {
    registry: ModelRegistry<R>,
}

impl<R: ModelRepository> EvaluationRunner<R> {
    /// Create the runner over a registry.
    pub fn new(registry: ModelRegistry<R>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl<R: ModelRepository + 'static> StepRunner for EvaluationRunner<R> {
    async fn run(&self, ctx: StepContext) -> Result<StepOutputs, StepFailure> {
        let model_id = resolve_model_id(&ctx)?;
        let model = self
            .registry
            .get_model(model_id)
            .await
            .map_err(StepFailure::from_error)?;

        if let Some(min) = ctx.step.config.get("min_accuracy").and_then(|v| v.as_f64()) {
            let accuracy = model.accuracy().unwrap_or(0.0);
            if accuracy < min {
                return Err(StepFailure(format!(
                    "accuracy {accuracy:.3} below evaluation gate {min:.3}"
                )));
            }
        }

        let mut outputs = HashMap::from([
            ("model_id".to_string(), json!(model_id.to_string())),
            ("metrics".to_string(), json!(model.metrics)),
        ]);

        if let Some(baseline) = ctx.step.config.get("baseline_id").and_then(|v| v.as_str()) {
            let baseline_id =
                Uuid::parse_str(baseline).map_err(StepFailure::from_error)?;
            let comparison = self
                .registry
                .compare_models(model_id, baseline_id)
                .await
                .map_err(StepFailure::from_error)?;
            outputs.insert(
                "comparison".to_string(),
                serde_json::to_value(&comparison).map_err(StepFailure::from_error)?,
            );
        }

        Ok(outputs)
    }
}

/// Promotes the upstream model to production.
pub struct DeploymentRunner<R: ModelRepository> {
    registry: ModelRegistry<R>,
}

impl<R: ModelRepository> DeploymentRunner<R> {
    /// Create the runner over a registry.
    pub fn new(registry: ModelRegistry<R>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl<R: ModelRepository + 'static> StepRunner for DeploymentRunner<R> {
    async fn run(&self, ctx: StepContext) -> Result<StepOutputs, StepFailure> {
        let model_id = resolve_model_id(&ctx)?;
        let promoted = self
            .registry
            .promote_to_production(model_id)
            .await
            .map_err(StepFailure::from_error)?;
        Ok(HashMap::from([
            ("model_id".to_string(), json!(promoted.id.to_string())),
            ("version".to_string(), json!(promoted.version.to_string())),
            ("status".to_string(), json!("production")),
        ]))
    }
}

/// Pulls a monitoring report for the upstream model.
///
/// Config: optional `period_minutes` (default 60). A model with no recorded
/// traffic yet reports `no_traffic` instead of failing — a monitoring step
/// right after deployment is expected to find an idle model.
pub struct MonitoringRunner {
    monitor: Arc<ModelMonitor>,
}

impl MonitoringRunner {
    /// Create the runner over a monitor.
    pub fn new(monitor: Arc<ModelMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl StepRunner for MonitoringRunner {
    async fn run(&self, ctx: StepContext) -> Result<StepOutputs, StepFailure> {
        let model_id = resolve_model_id(&ctx)?;
        let minutes = ctx
            .step
            .config
            .get("period_minutes")
            .and_then(|v| v.as_i64())
            .unwrap_or(60);

        match self
            .monitor
            .performance_report(model_id, TimeWindow::last_minutes(minutes))
        {
            Ok(report) => Ok(HashMap::from([
                ("model_id".to_string(), json!(model_id.to_string())),
                ("uptime".to_string(), json!(report.uptime)),
                ("predictions".to_string(), json!(report.stats.predictions)),
                (
                    "recommendations".to_string(),
                    json!(report.recommendations),
                ),
            ])),
            Err(MonitorError::ModelNotTracked(_)) => Ok(HashMap::from([
                ("model_id".to_string(), json!(model_id.to_string())),
                ("status".to_string(), json!("no_traffic")),
            ])),
            Err(other) => Err(StepFailure::from_error(other)),
        }
    }
}

/// The standard runner set wiring one of each component.
pub fn standard_runners<FR, MR>(
    features: Arc<FeatureStore<FR>>,
    registry: ModelRegistry<MR>,
    monitor: Arc<ModelMonitor>,
) -> HashMap<StepType, Arc<dyn StepRunner>>
where
    FR: FeatureRepository + 'static,
    MR: ModelRepository + 'static,
{
    HashMap::from([
        (
            StepType::DataPreparation,
            Arc::new(DataPreparationRunner::new(features)) as Arc<dyn StepRunner>,
        ),
        (
            StepType::Training,
            Arc::new(TrainingRunner::new(registry.clone())) as Arc<dyn StepRunner>,
        ),
        (
            StepType::Evaluation,
            Arc::new(EvaluationRunner::new(registry.clone())) as Arc<dyn StepRunner>,
        ),
        (
            StepType::Deployment,
            Arc::new(DeploymentRunner::new(registry)) as Arc<dyn StepRunner>,
        ),
        (
            StepType::Monitoring,
            Arc::new(MonitoringRunner::new(monitor)) as Arc<dyn StepRunner>,
        ),
    ])
}
