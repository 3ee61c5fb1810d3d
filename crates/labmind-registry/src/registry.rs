//! The model registry service.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use labmind_core::{
    JobId, ModelArtifact, ModelBackend, ModelId, TrainingConfig, TrainingDataset,
};

use crate::compare::{compare, ModelComparison};
use crate::error::{RegistryError, RegistryResult};
use crate::jobs::{JobStatus, TrainingJob};
use crate::repository::ModelRepository;
use crate::types::{new_version, ModelKind, ModelStatus, ModelVersion, SemanticVersion};

/// Registration request for a trained artifact.
#[derive(Debug, Clone)]
pub struct RegisterModel {
    /// Lineage name; versions sharing it are one model.
    pub name: String,
    /// Problem kind.
    pub kind: ModelKind,
    /// Producing framework tag.
    pub framework: String,
    /// The opaque artifact to store.
    pub artifact: ModelArtifact,
    /// Evaluation metrics known at registration.
    pub metrics: labmind_core::MetricMap,
    /// Free-form metadata.
    pub metadata: HashMap<String, String>,
}

/// Filters for [`ModelRegistry::search_models`]; every provided filter must
/// match (AND semantics).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSearchQuery {
    /// Case-insensitive substring of the model name.
    pub name_contains: Option<String>,
    /// Exact problem kind.
    pub kind: Option<ModelKind>,
    /// Exact framework tag.
    pub framework: Option<String>,
    /// Exact lifecycle status.
    pub status: Option<ModelStatus>,
    /// Minimum recorded accuracy metric.
    pub min_accuracy: Option<f64>,
}

impl ModelSearchQuery {
    fn matches(&self, model: &ModelVersion) -> bool {
        if let Some(fragment) = &self.name_contains {
            if !model
                .name
                .to_lowercase()
                .contains(&fragment.to_lowercase())
            {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if model.kind != kind {
                return false;
            }
        }
        if let Some(framework) = &self.framework {
            if &model.framework != framework {
                return false;
            }
        }
        if let Some(status) = self.status {
            if model.status != status {
                return false;
            }
        }
        if let Some(min) = self.min_accuracy {
            match model.accuracy() {
                Some(acc) if acc >= min => {}
                _ => return false,
            }
        }
        true
    }
}

/// Model registry: version lifecycle, promotion, comparison, search, and
/// training jobs.
///
/// Status mutations for a model name are serialized behind a per-name async
/// mutex, so concurrent promotions cannot both win and the production
/// invariant holds at every instant.
pub struct ModelRegistry<R: ModelRepository> {
    repo: Arc<R>,
    backend: Arc<dyn ModelBackend>,
    name_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl<R: ModelRepository> Clone for ModelRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            backend: Arc::clone(&self.backend),
            name_locks: Arc::clone(&self.name_locks),
        }
    }
}

impl<R: ModelRepository + 'static> ModelRegistry<R> {
    /// Create a registry over a repository and a model backend.
    pub fn new(repo: Arc<R>, backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            repo,
            backend,
            name_locks: Arc::new(DashMap::new()),
        }
    }

    fn name_lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.name_locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Register a new version of a model.
    ///
    /// The major version is auto-incremented per name:
    /// `next = max(existing majors) + 1`. The new version starts in
    /// `Validation`.
    pub async fn register_model(&self, request: RegisterModel) -> RegistryResult<ModelVersion> {
        let lock = self.name_lock(&request.name);
        let _guard = lock.lock().await;

        let existing = self.repo.models_by_name(&request.name).await?;
        let next_major = existing
            .iter()
            .map(|m| m.version.major)
            .max()
            .unwrap_or(0)
            + 1;

        let model = new_version(
            request.name,
            SemanticVersion::major_only(next_major),
            request.kind,
            request.framework,
            request.artifact,
            request.metrics,
            request.metadata,
        );
        self.repo.put_model(model.clone()).await?;
        info!(name = %model.name, version = %model.version, id = %model.id, "model registered");
        Ok(model)
    }

    /// Fetch a version by id.
    pub async fn get_model(&self, id: ModelId) -> RegistryResult<ModelVersion> {
        self.repo.model(id).await
    }

    /// Promote a version to production as one atomic unit.
    ///
    /// Under the name lock: every current production version of the same
    /// name is demoted to `Deprecated`, then the target is marked
    /// `Production`. Observers never see two production versions — the
    /// intermediate state has zero.
    pub async fn promote_to_production(&self, id: ModelId) -> RegistryResult<ModelVersion> {
        let target = self.repo.model(id).await?;
        let lock = self.name_lock(&target.name);
        let _guard = lock.lock().await;

        // Demote first. Re-read inside the lock so a racing promote that
        // finished before us is observed.
        for mut sibling in self.repo.models_by_name(&target.name).await? {
            if sibling.id != id && sibling.status == ModelStatus::Production {
                sibling.status = ModelStatus::Deprecated;
                sibling.touch();
                info!(name = %sibling.name, version = %sibling.version, "demoted to deprecated");
                self.repo.put_model(sibling).await?;
            }
        }

        let mut target = self.repo.model(id).await?;
        target.status = ModelStatus::Production;
        target.touch();
        self.repo.put_model(target.clone()).await?;
        info!(name = %target.name, version = %target.version, "promoted to production");
        Ok(target)
    }

    /// Versions of a name currently in production (the invariant keeps this
    /// at most one).
    pub async fn production_versions(&self, name: &str) -> RegistryResult<Vec<ModelVersion>> {
        Ok(self
            .repo
            .models_by_name(name)
            .await?
            .into_iter()
            .filter(|m| m.status == ModelStatus::Production)
            .collect())
    }

    /// Compare two versions metric by metric.
    pub async fn compare_models(
        &self,
        first: ModelId,
        second: ModelId,
    ) -> RegistryResult<ModelComparison> {
        let a = self.repo.model(first).await?;
        let b = self.repo.model(second).await?;
        Ok(compare(&a, &b))
    }

    /// Search versions; all provided filters must match.
    pub async fn search_models(
        &self,
        query: &ModelSearchQuery,
    ) -> RegistryResult<Vec<ModelVersion>> {
        let mut hits: Vec<ModelVersion> = self
            .repo
            .all_models()
            .await?
            .into_iter()
            .filter(|m| query.matches(m))
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name).then(b.version.cmp(&a.version)));
        Ok(hits)
    }

    /// Fetch a training job by id.
    pub async fn get_job(&self, id: JobId) -> RegistryResult<TrainingJob> {
        self.repo.job(id).await
    }

    /// Run one prediction through the backend with a version's artifact.
    pub async fn predict(
        &self,
        id: ModelId,
        input: &serde_json::Value,
    ) -> RegistryResult<serde_json::Value> {
        let model = self.repo.model(id).await?;
        Ok(self.backend.predict(&model.artifact, input).await?)
    }

    /// Start an asynchronous training run for an existing version.
    ///
    /// Returns the job id immediately; the spawned task reports progress and
    /// ordered log lines on the job. On success the version receives the new
    /// artifact and metrics and returns to `Validation`; on failure the
    /// version returns to `Validation` unchanged and the job carries the
    /// error in its log tail.
    pub async fn start_training(
        &self,
        model_id: ModelId,
        config: TrainingConfig,
        dataset: TrainingDataset,
    ) -> RegistryResult<JobId> {
        let model = self.repo.model(model_id).await?;

        {
            let lock = self.name_lock(&model.name);
            let _guard = lock.lock().await;
            let mut model = self.repo.model(model_id).await?;
            model.status = ModelStatus::Training;
            model.touch();
            self.repo.put_model(model).await?;
        }

        let mut job = TrainingJob::new(model_id, config.hyperparameters.clone());
        job.record(0.0, "job queued");
        let job_id = job.id;
        self.repo.put_job(job).await?;

        let registry = self.clone();
        tokio::spawn(async move {
            if let Err(err) = registry.run_training(job_id, model_id, config, dataset).await {
                error!(%job_id, %err, "training job bookkeeping failed");
            }
        });

        Ok(job_id)
    }

    /// Drive one training run to completion. Runs inside the spawned task.
    async fn run_training(
        &self,
        job_id: JobId,
        model_id: ModelId,
        config: TrainingConfig,
        dataset: TrainingDataset,
    ) -> RegistryResult<()> {
        self.update_job(job_id, |job| {
            job.status = JobStatus::Running;
            job.record(0.05, format!("training started ({} rows)", dataset.len()));
        })
        .await?;

        match self.backend.train(&config, &dataset).await {
            Ok(outcome) => {
                self.update_job(job_id, |job| {
                    job.record(0.9, "training complete, recording artifact");
                })
                .await?;

                let name = self.repo.model(model_id).await?.name;
                {
                    let lock = self.name_lock(&name);
                    let _guard = lock.lock().await;
                    let mut model = self.repo.model(model_id).await?;
                    model.artifact = outcome.artifact;
                    model.metrics = outcome.metrics.clone();
                    model.status = ModelStatus::Validation;
                    model.touch();
                    self.repo.put_model(model).await?;
                }

                self.update_job(job_id, |job| {
                    job.status = JobStatus::Completed;
                    job.metrics = Some(outcome.metrics.clone());
                    job.record(1.0, "job completed");
                })
                .await?;
                debug!(%job_id, "training job completed");
            }
            Err(err) => {
                let name = self.repo.model(model_id).await?.name;
                {
                    let lock = self.name_lock(&name);
                    let _guard = lock.lock().await;
                    let mut model = self.repo.model(model_id).await?;
                    model.status = ModelStatus::Validation;
                    model.touch();
                    self.repo.put_model(model).await?;
                }

                self.update_job(job_id, |job| {
                    job.status = JobStatus::Failed;
                    job.record(job.progress, format!("training failed: {err}"));
                })
                .await?;
                error!(%job_id, %err, "training job failed");
            }
        }
        Ok(())
    }

    async fn update_job(
        &self,
        id: JobId,
        mutate: impl FnOnce(&mut TrainingJob),
    ) -> RegistryResult<()> {
        let mut job = self.repo.job(id).await?;
        mutate(&mut job);
        self.repo.put_job(job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryModelRepository;
    use labmind_core::stubs::NaiveModelBackend;
    use std::time::Duration;

    fn registry() -> ModelRegistry<InMemoryModelRepository> {
        ModelRegistry::new(
            Arc::new(InMemoryModelRepository::new()),
            Arc::new(NaiveModelBackend::new()),
        )
    }

    fn request(name: &str, accuracy: f64) -> RegisterModel {
        RegisterModel {
            name: name.into(),
            kind: ModelKind::Regression,
            framework: "naive-linear".into(),
            artifact: ModelArtifact::new(vec![], "application/x-test"),
            metrics: [("accuracy".to_string(), accuracy)].into_iter().collect(),
            metadata: HashMap::new(),
        }
    }

    async fn wait_terminal(
        registry: &ModelRegistry<InMemoryModelRepository>,
        job_id: JobId,
    ) -> TrainingJob {
        for _ in 0..500 {
            let job = registry.get_job(job_id).await.expect("job exists");
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("training job never reached a terminal state");
    }

    #[tokio::test]
    async fn majors_auto_increment_per_name() {
        let reg = registry();
        let v1 = reg.register_model(request("power_model", 0.9)).await.unwrap();
        let v2 = reg.register_model(request("power_model", 0.92)).await.unwrap();
        let other = reg.register_model(request("ph_model", 0.8)).await.unwrap();

        assert_eq!(v1.version.major, 1);
        assert_eq!(v2.version.major, 2);
        assert_eq!(other.version.major, 1);
        assert_eq!(v1.status, ModelStatus::Validation);
    }

    #[tokio::test]
    async fn promotion_demotes_previous_production() {
        let reg = registry();
        let v1 = reg.register_model(request("power_model", 0.90)).await.unwrap();
        reg.promote_to_production(v1.id).await.unwrap();

        let v2 = reg.register_model(request("power_model", 0.95)).await.unwrap();
        reg.promote_to_production(v2.id).await.unwrap();

        let production = reg.production_versions("power_model").await.unwrap();
        assert_eq!(production.len(), 1);
        assert_eq!(production[0].id, v2.id);

        let v1_after = reg.get_model(v1.id).await.unwrap();
        assert_eq!(v1_after.status, ModelStatus::Deprecated);
    }

    #[tokio::test]
    async fn concurrent_promotions_leave_one_production() {
        let reg = registry();
        let v1 = reg.register_model(request("power_model", 0.90)).await.unwrap();
        let v2 = reg.register_model(request("power_model", 0.95)).await.unwrap();

        let (r1, r2) = tokio::join!(
            reg.promote_to_production(v1.id),
            reg.promote_to_production(v2.id)
        );
        r1.unwrap();
        r2.unwrap();

        let production = reg.production_versions("power_model").await.unwrap();
        assert_eq!(production.len(), 1, "exactly one version may win");
    }

    #[tokio::test]
    async fn search_applies_and_semantics() {
        let reg = registry();
        reg.register_model(request("power_model", 0.9)).await.unwrap();
        reg.register_model(request("power_model", 0.7)).await.unwrap();
        reg.register_model(request("ph_model", 0.95)).await.unwrap();

        let query = ModelSearchQuery {
            name_contains: Some("power".into()),
            min_accuracy: Some(0.8),
            ..Default::default()
        };
        let hits = reg.search_models(&query).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "power_model");
        assert_eq!(hits[0].accuracy(), Some(0.9));
    }

    #[tokio::test]
    async fn unknown_id_reports_not_found() {
        let reg = registry();
        let err = reg.get_model(uuid::Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RegistryError::ModelNotFound(_)));
        let err = reg
            .promote_to_production(uuid::Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn training_job_reports_progress_and_updates_model() {
        let reg = registry();
        let model = reg.register_model(request("power_model", 0.5)).await.unwrap();

        let dataset = TrainingDataset {
            feature_names: vec!["x".into()],
            rows: (0..10).map(|i| vec![i as f64]).collect(),
            targets: (0..10).map(|i| 2.0 * i as f64 + 1.0).collect(),
        };
        let job_id = reg
            .start_training(model.id, TrainingConfig::default(), dataset)
            .await
            .unwrap();

        let job = wait_terminal(&reg, job_id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 1.0);
        assert!(job.logs.first().unwrap().contains("queued"));
        assert!(job.logs.last().unwrap().contains("completed"));
        assert!(job.metrics.is_some());

        let updated = reg.get_model(model.id).await.unwrap();
        assert_eq!(updated.status, ModelStatus::Validation);
        assert!(updated.metrics.contains_key("mse"));
    }

    #[tokio::test]
    async fn failed_training_marks_job_failed() {
        let reg = registry();
        let model = reg.register_model(request("power_model", 0.5)).await.unwrap();

        // Empty dataset is rejected by the naive backend.
        let job_id = reg
            .start_training(model.id, TrainingConfig::default(), TrainingDataset::default())
            .await
            .unwrap();

        let job = wait_terminal(&reg, job_id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.logs.last().unwrap().contains("failed"));

        let restored = reg.get_model(model.id).await.unwrap();
        assert_eq!(restored.status, ModelStatus::Validation);
    }
}
