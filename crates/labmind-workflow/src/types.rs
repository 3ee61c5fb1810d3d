//! Workflow and step types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

use labmind_core::{StepId, WorkflowId};

/// Which component a step delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// Assemble a training dataset from the feature store.
    DataPreparation,
    /// Train a model version through the registry.
    Training,
    /// Evaluate or compare trained versions.
    Evaluation,
    /// Promote a version to production.
    Deployment,
    /// Pull a monitoring report for a deployed version.
    Monitoring,
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DataPreparation => "data_preparation",
            Self::Training => "training",
            Self::Evaluation => "evaluation",
            Self::Deployment => "deployment",
            Self::Monitoring => "monitoring",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet started (or reset by a cancelled attempt).
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully; outputs are final.
    Completed,
    /// Gave up after the retry budget.
    Failed,
}

/// Lifecycle of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Created, not yet executed.
    Draft,
    /// Executor is stepping through the DAG.
    Running,
    /// Every step completed.
    Completed,
    /// A step exhausted its budget or failed structurally.
    Failed,
    /// Suspended between steps; resume continues from the first
    /// non-completed step.
    Paused,
}

/// One step of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Unique step id.
    pub id: StepId,
    /// Human-readable name, used in errors and logs.
    pub name: String,
    /// Component this step delegates to.
    pub step_type: StepType,
    /// Runner-interpreted configuration.
    pub config: serde_json::Value,
    /// Steps that must be `Completed` before this one starts.
    pub depends_on: HashSet<StepId>,
    /// Current status.
    pub status: StepStatus,
    /// Attempts consumed (resets never; spans pauses).
    pub attempts: u32,
    /// When the last attempt started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the step reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
    /// Outputs visible to dependent steps after completion.
    pub outputs: HashMap<String, serde_json::Value>,
}

impl WorkflowStep {
    /// Create a pending step with no dependencies.
    pub fn new(name: impl Into<String>, step_type: StepType, config: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            step_type,
            config,
            depends_on: HashSet::new(),
            status: StepStatus::Pending,
            attempts: 0,
            started_at: None,
            finished_at: None,
            outputs: HashMap::new(),
        }
    }

    /// Declare a dependency (builder pattern).
    #[must_use]
    pub fn after(mut self, dependency: StepId) -> Self {
        self.depends_on.insert(dependency);
        self
    }
}

/// A DAG of steps with an overall status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlWorkflow {
    /// Unique workflow id.
    pub id: WorkflowId,
    /// Workflow name.
    pub name: String,
    /// Steps in declaration order. Execution order is the topological sort.
    pub steps: Vec<WorkflowStep>,
    /// Overall status.
    pub status: WorkflowStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl MlWorkflow {
    /// Create a draft workflow.
    pub fn new(name: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            steps,
            status: WorkflowStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// Find a step by id.
    pub fn step(&self, id: StepId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Find a step mutably by id.
    pub fn step_mut(&mut self, id: StepId) -> Option<&mut WorkflowStep> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Whether every step completed.
    pub fn all_steps_completed(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Completed)
    }

    /// Stamp a mutation time.
    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
