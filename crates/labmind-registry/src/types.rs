//! Model version domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use labmind_core::{MetricMap, ModelArtifact, ModelId};

/// What kind of problem a model solves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Discrete-label prediction (electrode pass/fail, strain identification).
    Classification,
    /// Continuous-value prediction (power density, substrate conversion).
    Regression,
    /// Sequence forecasting over reactor telemetry.
    TimeSeries,
    /// Outlier detection over operating conditions.
    Anomaly,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Classification => "classification",
            Self::Regression => "regression",
            Self::TimeSeries => "time_series",
            Self::Anomaly => "anomaly",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle status of a model version.
///
/// At most one version per model name may be `Production` at any instant;
/// the registry enforces this by demoting before promoting under a per-name
/// lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    /// A training job is producing this version.
    Training,
    /// Trained, under evaluation. Freshly registered versions start here.
    Validation,
    /// Serving live predictions.
    Production,
    /// Superseded; kept for history and rollback.
    Deprecated,
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Training => "training",
            Self::Validation => "validation",
            Self::Production => "production",
            Self::Deprecated => "deprecated",
        };
        write!(f, "{s}")
    }
}

/// Semantic version. Registration auto-increments the major component per
/// model name; minor/patch are available to callers that re-register
/// artifacts under an existing major line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct SemanticVersion {
    /// Incompatible revision line.
    pub major: u32,
    /// Backward-compatible additions.
    pub minor: u32,
    /// Fixes within a minor line.
    pub patch: u32,
}

impl SemanticVersion {
    /// First version of a new major line.
    pub fn major_only(major: u32) -> Self {
        Self {
            major,
            minor: 0,
            patch: 0,
        }
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A registered model version with its opaque artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersion {
    /// Unique id of this version.
    pub id: ModelId,
    /// Model name; versions sharing a name form one lineage.
    pub name: String,
    /// Semantic version within the lineage.
    pub version: SemanticVersion,
    /// Problem kind.
    pub kind: ModelKind,
    /// Producing framework tag (free-form: "naive-linear", "sklearn", ...).
    pub framework: String,
    /// Lifecycle status.
    pub status: ModelStatus,
    /// Evaluation metrics recorded at registration or training completion.
    pub metrics: MetricMap,
    /// The trained artifact, opaque to the registry.
    pub artifact: ModelArtifact,
    /// Free-form metadata.
    pub metadata: HashMap<String, String>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl ModelVersion {
    /// Accuracy metric, if recorded.
    pub fn accuracy(&self) -> Option<f64> {
        self.metrics.get("accuracy").copied()
    }

    /// Stamp a mutation time. Used by the registry on status changes.
    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Create a fresh version record. Internal: callers go through
/// [`crate::registry::ModelRegistry::register_model`].
pub(crate) fn new_version(
    name: String,
    version: SemanticVersion,
    kind: ModelKind,
    framework: String,
    artifact: ModelArtifact,
    metrics: MetricMap,
    metadata: HashMap<String, String>,
) -> ModelVersion {
    let now = Utc::now();
    ModelVersion {
        id: Uuid::new_v4(),
        name,
        version,
        kind,
        framework,
        status: ModelStatus::Validation,
        metrics,
        artifact,
        metadata,
        created_at: now,
        updated_at: now,
    }
}
