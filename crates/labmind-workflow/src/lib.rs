//! labmind workflow orchestrator
//!
//! Composes the feature store, model registry, and monitor into DAG-based
//! ML workflows: data preparation, training, evaluation, deployment, and
//! monitoring steps with declared dependencies.
//!
//! # Guarantees
//!
//! - Dependencies are validated at creation; a cyclic DAG raises
//!   `CircularDependency` before any step runs (three-color DFS).
//! - No step starts before all of its dependencies are `Completed`.
//! - Each step runs under a budget: a timeout per attempt, bounded retries
//!   with linear backoff, `StepTimeout` after exhaustion.
//! - Pause is cooperative: the signal is honored between steps and can
//!   cancel an in-flight step at its next checkpoint; resume skips steps
//!   that already completed.
//! - A step failure halts the workflow; remaining steps do not run.

pub mod dag;
pub mod error;
pub mod executor;
pub mod runner;
pub mod steps;
pub mod types;

pub use dag::{topological_order, validate_dependencies};
pub use error::{WorkflowError, WorkflowResult};
pub use executor::{ExecutorConfig, WorkflowExecutor};
pub use runner::{StepContext, StepFailure, StepOutputs, StepRunner};
pub use steps::standard_runners;
pub use types::{MlWorkflow, StepStatus, StepType, WorkflowStatus, WorkflowStep};
