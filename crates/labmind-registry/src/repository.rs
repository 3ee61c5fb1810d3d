//! Storage port for model versions and training jobs.

use async_trait::async_trait;
use dashmap::DashMap;

use labmind_core::{JobId, ModelId};

use crate::error::{RegistryError, RegistryResult};
use crate::jobs::TrainingJob;
use crate::types::ModelVersion;

/// Storage port for the registry.
///
/// `put_*` upserts; status-mutation atomicity lives in the service layer,
/// which serializes writers per model name before calling in here.
#[async_trait]
pub trait ModelRepository: Send + Sync {
    /// Insert or replace a model version.
    async fn put_model(&self, model: ModelVersion) -> RegistryResult<()>;

    /// Fetch a model version by id.
    async fn model(&self, id: ModelId) -> RegistryResult<ModelVersion>;

    /// All versions sharing a model name.
    async fn models_by_name(&self, name: &str) -> RegistryResult<Vec<ModelVersion>>;

    /// Every registered version.
    async fn all_models(&self) -> RegistryResult<Vec<ModelVersion>>;

    /// Insert or replace a training job.
    async fn put_job(&self, job: TrainingJob) -> RegistryResult<()>;

    /// Fetch a training job by id.
    async fn job(&self, id: JobId) -> RegistryResult<TrainingJob>;
}

/// In-memory [`ModelRepository`] over concurrent maps.
#[derive(Debug, Default)]
pub struct InMemoryModelRepository {
    models: DashMap<ModelId, ModelVersion>,
    jobs: DashMap<JobId, TrainingJob>,
}

impl InMemoryModelRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelRepository for InMemoryModelRepository {
    async fn put_model(&self, model: ModelVersion) -> RegistryResult<()> {
        self.models.insert(model.id, model);
        Ok(())
    }

    async fn model(&self, id: ModelId) -> RegistryResult<ModelVersion> {
        self.models
            .get(&id)
            .map(|m| m.value().clone())
            .ok_or(RegistryError::ModelNotFound(id))
    }

    async fn models_by_name(&self, name: &str) -> RegistryResult<Vec<ModelVersion>> {
        Ok(self
            .models
            .iter()
            .filter(|entry| entry.name == name)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn all_models(&self) -> RegistryResult<Vec<ModelVersion>> {
        Ok(self.models.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn put_job(&self, job: TrainingJob) -> RegistryResult<()> {
        self.jobs.insert(job.id, job);
        Ok(())
    }

    async fn job(&self, id: JobId) -> RegistryResult<TrainingJob> {
        self.jobs
            .get(&id)
            .map(|j| j.value().clone())
            .ok_or(RegistryError::JobNotFound(id))
    }
}
