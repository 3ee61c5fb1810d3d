//! The workflow executor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use labmind_core::{StepId, WorkflowId};

use crate::dag::{topological_order, validate_dependencies};
use crate::error::{WorkflowError, WorkflowResult};
use crate::runner::{StepContext, StepOutputs, StepRunner};
use crate::types::{MlWorkflow, StepStatus, StepType, WorkflowStatus, WorkflowStep};

/// Per-step execution budget.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    /// Attempts per step before giving up.
    pub max_retries: u32,
    /// Wall-clock budget per attempt.
    pub step_timeout: Duration,
    /// Linear backoff base: attempt N sleeps N × this before retrying.
    pub backoff_base: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            step_timeout: Duration::from_secs(300),
            backoff_base: Duration::from_secs(1),
        }
    }
}

/// What one step attempt loop concluded.
enum StepOutcome {
    Completed(StepOutputs),
    Cancelled,
    Failed { attempts: u32, reason: String },
    TimedOut { attempts: u32 },
}

/// DAG executor over registered [`StepRunner`]s.
///
/// Owns every workflow exclusively; mutations for one workflow are
/// serialized behind a per-workflow async mutex, so concurrent execute and
/// resume calls cannot interleave step updates. Pause does not take that
/// lock — it only flips the watch signal the running loop observes.
pub struct WorkflowExecutor {
    workflows: DashMap<WorkflowId, MlWorkflow>,
    runners: HashMap<StepType, Arc<dyn StepRunner>>,
    config: ExecutorConfig,
    pause_signals: DashMap<WorkflowId, watch::Sender<bool>>,
    run_locks: DashMap<WorkflowId, Arc<Mutex<()>>>,
}

impl WorkflowExecutor {
    /// Create an executor with the default step budget and no runners.
    pub fn new(runners: HashMap<StepType, Arc<dyn StepRunner>>) -> Self {
        Self::with_config(runners, ExecutorConfig::default())
    }

    /// Create an executor with an explicit step budget.
    pub fn with_config(
        runners: HashMap<StepType, Arc<dyn StepRunner>>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            workflows: DashMap::new(),
            runners,
            config,
            pause_signals: DashMap::new(),
            run_locks: DashMap::new(),
        }
    }

    /// Validate step dependencies and store a draft workflow.
    ///
    /// # Errors
    ///
    /// `UnknownDependency` when a step references an id outside the set.
    pub fn create_workflow(
        &self,
        name: &str,
        steps: Vec<WorkflowStep>,
    ) -> WorkflowResult<MlWorkflow> {
        validate_dependencies(&steps)?;
        let workflow = MlWorkflow::new(name, steps);
        let (pause_tx, _) = watch::channel(false);
        self.pause_signals.insert(workflow.id, pause_tx);
        self.workflows.insert(workflow.id, workflow.clone());
        info!(workflow = %workflow.name, id = %workflow.id, steps = workflow.steps.len(), "workflow created");
        Ok(workflow)
    }

    /// Fetch a workflow by id.
    pub fn get_workflow(&self, id: WorkflowId) -> WorkflowResult<MlWorkflow> {
        self.workflows
            .get(&id)
            .map(|w| w.value().clone())
            .ok_or(WorkflowError::WorkflowNotFound(id))
    }

    /// Request a pause. The running loop honors it between steps and cancels
    /// an in-flight attempt at its next checkpoint; the cancelled step goes
    /// back to `Pending` so nothing half-finished is recorded.
    pub fn pause_workflow(&self, id: WorkflowId) -> WorkflowResult<()> {
        let signal = self
            .pause_signals
            .get(&id)
            .ok_or(WorkflowError::WorkflowNotFound(id))?;
        let _ = signal.send(true);
        info!(workflow = %id, "pause requested");
        Ok(())
    }

    /// Resume a paused workflow. Steps already `Completed` are skipped —
    /// completion is kept across the pause, so runners need not be
    /// idempotent.
    pub async fn resume_workflow(&self, id: WorkflowId) -> WorkflowResult<MlWorkflow> {
        {
            let workflow = self.get_workflow(id)?;
            if workflow.status != WorkflowStatus::Paused {
                return Err(WorkflowError::InvalidState {
                    workflow: id,
                    status: workflow.status,
                    operation: "resume",
                });
            }
        }
        if let Some(signal) = self.pause_signals.get(&id) {
            let _ = signal.send(false);
        }
        info!(workflow = %id, "resuming");
        self.run(id).await
    }

    /// Execute a draft workflow to completion, failure, or pause.
    ///
    /// The topological order is computed first; a cyclic DAG raises
    /// `CircularDependency` before any step runs.
    pub async fn execute_workflow(&self, id: WorkflowId) -> WorkflowResult<MlWorkflow> {
        {
            let workflow = self.get_workflow(id)?;
            if !matches!(workflow.status, WorkflowStatus::Draft | WorkflowStatus::Failed) {
                return Err(WorkflowError::InvalidState {
                    workflow: id,
                    status: workflow.status,
                    operation: "execute",
                });
            }
        }
        self.run(id).await
    }

    /// Shared stepping loop for execute and resume.
    async fn run(&self, id: WorkflowId) -> WorkflowResult<MlWorkflow> {
        let lock = self
            .run_locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let workflow = self.get_workflow(id)?;
        // Cycle detection happens before any step transitions.
        let order = topological_order(&workflow.steps)?;
        for step in &workflow.steps {
            if !self.runners.contains_key(&step.step_type) {
                return Err(WorkflowError::NoRunner(step.step_type));
            }
        }

        self.update(id, |w| w.status = WorkflowStatus::Running)?;
        let pause_rx = self
            .pause_signals
            .get(&id)
            .map(|s| s.subscribe())
            .ok_or(WorkflowError::WorkflowNotFound(id))?;

        let mut upstream_outputs: HashMap<StepId, StepOutputs> = HashMap::new();
        for step in self
            .get_workflow(id)?
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
        {
            upstream_outputs.insert(step.id, step.outputs.clone());
        }

        for step_id in order {
            if *pause_rx.borrow() {
                self.update(id, |w| w.status = WorkflowStatus::Paused)?;
                info!(workflow = %id, "paused between steps");
                return self.get_workflow(id);
            }

            let step = self
                .get_workflow(id)?
                .step(step_id)
                .cloned()
                .expect("step ids come from this workflow's topological order");
            if step.status == StepStatus::Completed {
                debug!(step = %step.name, "already completed, skipping");
                continue;
            }

            // Topological order plus halt-on-failure guarantees this; it is
            // the executor's core invariant, so assert it.
            debug_assert!(step
                .depends_on
                .iter()
                .all(|dep| upstream_outputs.contains_key(dep)));

            let upstream: HashMap<StepId, StepOutputs> = step
                .depends_on
                .iter()
                .filter_map(|dep| upstream_outputs.get(dep).map(|o| (*dep, o.clone())))
                .collect();

            match self
                .run_step(id, &step, upstream, pause_rx.clone())
                .await
            {
                StepOutcome::Completed(outputs) => {
                    upstream_outputs.insert(step_id, outputs.clone());
                    self.update(id, |w| {
                        if let Some(s) = w.step_mut(step_id) {
                            s.status = StepStatus::Completed;
                            s.finished_at = Some(Utc::now());
                            s.outputs = outputs.clone();
                        }
                    })?;
                }
                StepOutcome::Cancelled => {
                    self.update(id, |w| {
                        if let Some(s) = w.step_mut(step_id) {
                            s.status = StepStatus::Pending;
                        }
                        w.status = WorkflowStatus::Paused;
                    })?;
                    info!(workflow = %id, step = %step.name, "in-flight step cancelled by pause");
                    return self.get_workflow(id);
                }
                StepOutcome::Failed { attempts, reason } => {
                    self.update(id, |w| {
                        if let Some(s) = w.step_mut(step_id) {
                            s.status = StepStatus::Failed;
                            s.finished_at = Some(Utc::now());
                        }
                        w.status = WorkflowStatus::Failed;
                    })?;
                    warn!(workflow = %id, step = %step.name, attempts, %reason, "step failed; halting workflow");
                    return Err(WorkflowError::StepFailed {
                        step: step.name.clone(),
                        attempts,
                        reason,
                    });
                }
                StepOutcome::TimedOut { attempts } => {
                    self.update(id, |w| {
                        if let Some(s) = w.step_mut(step_id) {
                            s.status = StepStatus::Failed;
                            s.finished_at = Some(Utc::now());
                        }
                        w.status = WorkflowStatus::Failed;
                    })?;
                    warn!(workflow = %id, step = %step.name, attempts, "step timed out; halting workflow");
                    return Err(WorkflowError::StepTimeout {
                        step: step.name.clone(),
                        attempts,
                    });
                }
            }
        }

        self.update(id, |w| w.status = WorkflowStatus::Completed)?;
        info!(workflow = %id, "workflow completed");
        self.get_workflow(id)
    }

    /// Run one step under the retry/timeout budget.
    async fn run_step(
        &self,
        workflow_id: WorkflowId,
        step: &WorkflowStep,
        upstream: HashMap<StepId, StepOutputs>,
        mut pause_rx: watch::Receiver<bool>,
    ) -> StepOutcome {
        let runner = Arc::clone(
            self.runners
                .get(&step.step_type)
                .expect("runner presence checked before the loop"),
        );

        let mut attempts = 0;
        let mut last_failure = String::new();
        let mut timed_out = false;

        while attempts < self.config.max_retries {
            attempts += 1;
            let _ = self.update(workflow_id, |w| {
                if let Some(s) = w.step_mut(step.id) {
                    s.status = StepStatus::Running;
                    s.attempts = attempts;
                    s.started_at = Some(Utc::now());
                }
            });

            let ctx = StepContext {
                workflow_id,
                step: step.clone(),
                upstream: upstream.clone(),
                cancel: pause_rx.clone(),
            };

            tokio::select! {
                attempt = tokio::time::timeout(self.config.step_timeout, runner.run(ctx)) => {
                    match attempt {
                        Ok(Ok(outputs)) => {
                            debug!(step = %step.name, attempts, "step completed");
                            return StepOutcome::Completed(outputs);
                        }
                        Ok(Err(failure)) => {
                            warn!(step = %step.name, attempts, %failure, "step attempt failed");
                            last_failure = failure.to_string();
                            timed_out = false;
                        }
                        Err(_) => {
                            warn!(step = %step.name, attempts, "step attempt timed out");
                            timed_out = true;
                        }
                    }
                }
                _ = wait_for_pause(&mut pause_rx) => {
                    return StepOutcome::Cancelled;
                }
            }

            if attempts < self.config.max_retries {
                // Linear backoff: 1 × base, then 2 × base, ...
                tokio::time::sleep(self.config.backoff_base * attempts).await;
            }
        }

        if timed_out {
            StepOutcome::TimedOut { attempts }
        } else {
            StepOutcome::Failed {
                attempts,
                reason: last_failure,
            }
        }
    }

    fn update(
        &self,
        id: WorkflowId,
        mutate: impl FnOnce(&mut MlWorkflow),
    ) -> WorkflowResult<()> {
        let mut workflow = self
            .workflows
            .get_mut(&id)
            .ok_or(WorkflowError::WorkflowNotFound(id))?;
        mutate(&mut workflow);
        workflow.touch();
        Ok(())
    }
}

/// Resolve when the pause signal turns true. Never resolves if the signal
/// stays false (or its sender is gone), so it is safe inside `select!`.
async fn wait_for_pause(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender dropped while unpaused: pause can never arrive.
            std::future::pending::<()>().await;
        }
    }
}
