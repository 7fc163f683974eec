//! The orchestrator: owns the pipeline state and drives the step loop
//!
//! Every state transition is persisted before the orchestrator acts on it,
//! so the host process can die at any point and a later invocation picks up
//! from the durable record. Recovery is at-least-once: a step interrupted
//! mid-flight is re-invoked, which is why executors must be idempotent.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::{
    Decision, Gate, OnFail, PipelineDefinition, PipelineState, RetryOutcome, RunState,
    StepContext, StepRecord, StepSpec,
};
use crate::engine::{
    EngineError, FailureAction, GateEngine, RetryCoordinator, RevertManager, RevertTarget,
};
use crate::executor::{ExecutorError, ExecutionResult, StepExecutor};
use crate::store::layout::PIPELINE_KEY;
use crate::store::{StateStore, StoreError, Workspace};

/// Events emitted during orchestration
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    PipelineStarted { run_id: Uuid, name: String },
    StepStarted { index: usize, name: String },
    StepPassed { index: usize, name: String, summary: String },
    AwaitingApproval { index: usize, name: String },
    StepRetrying { index: usize, reason: String },
    StepBounced { from: usize, to: usize, reason: String },
    DecisionApplied { index: usize, decision: &'static str },
    PipelineFailed { index: usize, reason: String },
    PipelineCompleted,
}

/// Callback invoked for each pipeline event
pub type EventHandler = Box<dyn Fn(&PipelineEvent) + Send + Sync>;

/// A decision applied to a pipeline paused at an approval gate
#[derive(Debug, Clone)]
pub enum ControlDecision {
    /// Accept the paused step's output and continue
    Approve,
    /// Re-run the paused step with feedback, then gate it again
    Revise { feedback: String },
    /// Mark the paused step skipped and continue
    Skip,
    /// Rewind to an earlier step, purging everything from there on
    Revert { target: RevertTarget },
    /// End this invocation, leaving the gate open
    Stop,
}

impl ControlDecision {
    fn name(&self) -> &'static str {
        match self {
            ControlDecision::Approve => "approve",
            ControlDecision::Revise { .. } => "revise",
            ControlDecision::Skip => "skip",
            ControlDecision::Revert { .. } => "revert",
            ControlDecision::Stop => "stop",
        }
    }
}

/// Whether the step loop keeps going after an advance
enum Flow {
    Continue,
    Yield,
}

/// Drives a pipeline definition against a state store and an executor
pub struct Orchestrator<E, S> {
    definition: PipelineDefinition,
    executor: E,
    store: S,
    workspace: Workspace,
    parameters: HashMap<String, String>,
    gate: GateEngine,
    retry: RetryCoordinator,
    revert: RevertManager,
    handlers: Vec<EventHandler>,
}

impl<E: StepExecutor, S: StateStore> Orchestrator<E, S> {
    pub fn new(definition: PipelineDefinition, executor: E, store: S, workspace: Workspace) -> Self {
        let parameters = definition.parameters().clone();
        Self {
            definition,
            executor,
            store,
            workspace,
            parameters,
            gate: GateEngine::new(),
            retry: RetryCoordinator::new(),
            revert: RevertManager::new(),
            handlers: Vec::new(),
        }
    }

    /// Override or extend the definition's declared parameters
    pub fn with_parameters(mut self, overrides: HashMap<String, String>) -> Self {
        self.parameters.extend(overrides);
        self
    }

    /// Register a handler for pipeline events
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&PipelineEvent) + Send + Sync + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    pub fn definition(&self) -> &PipelineDefinition {
        &self.definition
    }

    /// Load the persisted state without touching it
    pub async fn status(&self) -> Result<Option<PipelineState>, EngineError> {
        self.load().await
    }

    /// Restore the durable state, or create a fresh run if none exists
    ///
    /// Recovery happens here: an unresolved step still flagged as running
    /// must be from an interrupted invocation, so the flag is cleared and
    /// the cursor re-derived from the records. A paused state is left
    /// exactly as persisted.
    pub async fn resume(&self) -> Result<PipelineState, EngineError> {
        match self.load().await? {
            Some(mut state) => {
                if state.steps.len() != self.definition.len() {
                    return Err(EngineError::InvalidState {
                        operation: "resume".to_string(),
                        state: format!(
                            "holding {} step records for a {}-step definition",
                            state.steps.len(),
                            self.definition.len()
                        ),
                    });
                }
                if !state.status.is_terminal() && !state.status.is_paused() {
                    for record in &mut state.steps {
                        if !record.is_resolved() && record.running_since.is_some() {
                            warn!(
                                step = record.index,
                                "step was interrupted mid-execution, will re-run"
                            );
                            record.running_since = None;
                        }
                    }
                    match state.first_unresolved() {
                        Some(next) => state.current_step = next,
                        None => state.status = RunState::Completed,
                    }
                }
                self.persist(&state).await?;
                debug!(run_id = %state.run_id, status = state.status.name(), "resumed run");
                Ok(state)
            }
            None => {
                let state = PipelineState::new(&self.definition, self.parameters.clone());
                self.persist(&state).await?;
                info!(run_id = %state.run_id, pipeline = self.definition.name(), "created new run");
                self.emit(&PipelineEvent::PipelineStarted {
                    run_id: state.run_id,
                    name: self.definition.name().to_string(),
                });
                Ok(state)
            }
        }
    }

    /// Resume and execute until the pipeline pauses, yields, or finishes
    ///
    /// Returns the run status at the point control comes back: `Paused` at
    /// an approval gate, `Running` after an auto gate, `Completed`, or
    /// `Failed` when a step exhausted its recovery budget during this
    /// invocation. A pipeline that was already halted before this call is
    /// an error instead.
    pub async fn run(&self) -> Result<RunState, EngineError> {
        let mut state = self.resume().await?;
        match &state.status {
            RunState::Completed => return Ok(RunState::Completed),
            RunState::Paused { .. } => return Ok(state.status.clone()),
            RunState::Failed { step, reason } => {
                return Err(EngineError::Halted {
                    step: *step,
                    reason: reason.clone(),
                });
            }
            RunState::NotStarted | RunState::Running => {}
        }
        state.status = RunState::Running;
        self.drive(&mut state, None).await
    }

    /// Apply a decision to a pipeline paused at an approval gate
    pub async fn apply_decision(&self, decision: ControlDecision) -> Result<RunState, EngineError> {
        let operation = decision.name();
        let mut state = match self.load().await? {
            Some(state) => state,
            None => {
                return Err(EngineError::InvalidState {
                    operation: operation.to_string(),
                    state: "not-started".to_string(),
                });
            }
        };
        let paused_at = match &state.status {
            RunState::Paused { step } => *step,
            RunState::Failed { step, reason } => {
                return Err(EngineError::Halted {
                    step: *step,
                    reason: reason.clone(),
                });
            }
            other => {
                return Err(EngineError::InvalidState {
                    operation: operation.to_string(),
                    state: other.name().to_string(),
                });
            }
        };

        info!(step = paused_at, decision = operation, "applying decision");
        self.emit(&PipelineEvent::DecisionApplied {
            index: paused_at,
            decision: operation,
        });

        match decision {
            ControlDecision::Approve => {
                self.commit_decision(&mut state, paused_at, Decision::Approved)
                    .await?;
                self.drive(&mut state, None).await
            }
            ControlDecision::Skip => {
                self.commit_decision(&mut state, paused_at, Decision::Skipped)
                    .await?;
                self.drive(&mut state, None).await
            }
            ControlDecision::Revise { feedback } => {
                self.record_for(&mut state, paused_at)?.revisions += 1;
                state.status = RunState::Running;
                state.current_step = paused_at;
                self.persist(&state).await?;
                self.drive(&mut state, Some(feedback)).await
            }
            ControlDecision::Revert { target } => {
                let index = self.revert.resolve(&self.definition, &target)?;
                self.revert
                    .apply(&mut state, &self.store, &self.workspace, index)
                    .await?;
                state.status = RunState::Running;
                self.persist(&state).await?;
                self.drive(&mut state, None).await
            }
            ControlDecision::Stop => Ok(state.status.clone()),
        }
    }

    /// Delete every state record, keeping deliverables
    pub async fn reset_state(&self) -> Result<usize, EngineError> {
        let removed = self.store.delete_prefix("").await?;
        info!(removed, "state records cleared");
        Ok(removed)
    }

    /// Delete every state record and the deliverable directory
    pub async fn reset_all(&self) -> Result<usize, EngineError> {
        let removed = self.reset_state().await?;
        match tokio::fs::remove_dir_all(self.workspace.deliverable_dir()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(EngineError::Store(e.into())),
        }
        Ok(removed)
    }

    async fn drive(
        &self,
        state: &mut PipelineState,
        feedback: Option<String>,
    ) -> Result<RunState, EngineError> {
        let mut feedback = feedback;
        loop {
            if state.status.is_terminal() || state.status.is_paused() {
                return Ok(state.status.clone());
            }
            match self.advance(state, feedback.take()).await? {
                Flow::Continue => {}
                Flow::Yield => return Ok(state.status.clone()),
            }
        }
    }

    /// Execute one invocation of the step at the cursor
    async fn advance(
        &self,
        state: &mut PipelineState,
        feedback: Option<String>,
    ) -> Result<Flow, EngineError> {
        let index = state.current_step;
        let step = self
            .definition
            .step(index)
            .ok_or_else(|| EngineError::InvalidState {
                operation: "advance".to_string(),
                state: format!("cursor {index} is outside the definition"),
            })?
            .clone();

        self.emit(&PipelineEvent::StepStarted {
            index,
            name: step.name.clone(),
        });

        // The running marker must be durable before the executor starts,
        // otherwise a crash during execution is indistinguishable from one
        // before it
        self.record_for(state, index)?.running_since = Some(Utc::now());
        self.persist(state).await?;

        let mut ctx = StepContext::for_step(
            state,
            index,
            self.workspace.state_dir(),
            self.workspace.deliverable_dir(),
            self.workspace.record_path(&self.workspace.step_key(index)),
        );
        if let Some(feedback) = feedback {
            ctx = ctx.with_feedback(feedback);
        }
        if let Some(reason) = self.retry_reason_for(state, index) {
            ctx = ctx.with_retry_reason(reason);
        }

        let invocation = self.executor.invoke(&step, &ctx).await;
        self.record_for(state, index)?.running_since = None;

        match invocation {
            Ok(result) => {
                let outcome = self
                    .gate
                    .validate(&step, &result, &self.store, &self.workspace)
                    .await?;
                if outcome.pass {
                    self.commit_pass(state, &step, result).await
                } else {
                    self.apply_failure(state, &step, outcome.reason()).await
                }
            }
            // Failing to even spawn the worker is an infrastructure
            // problem, not a step failure; surface it instead of burning
            // the retry budget
            Err(e @ (ExecutorError::Spawn(_) | ExecutorError::Internal(_))) => {
                self.persist(state).await?;
                Err(EngineError::Executor(e))
            }
            Err(e) => self.apply_failure(state, &step, e.to_string()).await,
        }
    }

    async fn commit_pass(
        &self,
        state: &mut PipelineState,
        step: &StepSpec,
        result: ExecutionResult,
    ) -> Result<Flow, EngineError> {
        {
            let record = self.record_for(state, step.index)?;
            record.summary = Some(result.summary.clone());
            record.deliverables = result.deliverables;
        }
        self.retry.mark_resolved(&self.definition, state, step.index);
        self.emit(&PipelineEvent::StepPassed {
            index: step.index,
            name: step.name.clone(),
            summary: result.summary,
        });

        match step.gate {
            Gate::Approval => {
                state.status = RunState::Paused { step: step.index };
                self.persist(state).await?;
                self.emit(&PipelineEvent::AwaitingApproval {
                    index: step.index,
                    name: step.name.clone(),
                });
                Ok(Flow::Yield)
            }
            Gate::Auto => {
                self.commit_decision(state, step.index, Decision::Auto)
                    .await?;
                Ok(Flow::Yield)
            }
            Gate::None => {
                self.commit_decision(state, step.index, Decision::Auto)
                    .await?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Record a terminal decision and move the cursor forward
    async fn commit_decision(
        &self,
        state: &mut PipelineState,
        index: usize,
        decision: Decision,
    ) -> Result<(), EngineError> {
        {
            let record = self.record_for(state, index)?;
            let decision = if decision == Decision::Approved && record.revisions > 0 {
                Decision::Revised
            } else {
                decision
            };
            record.decision = Some(decision);
            record.completed_at = Some(Utc::now());
        }
        match state.first_unresolved() {
            Some(next) => {
                state.current_step = next;
                state.status = RunState::Running;
            }
            None => state.status = RunState::Completed,
        }
        self.persist(state).await?;
        if state.status == RunState::Completed {
            info!(run_id = %state.run_id, "pipeline completed");
            self.emit(&PipelineEvent::PipelineCompleted);
        }
        Ok(())
    }

    async fn apply_failure(
        &self,
        state: &mut PipelineState,
        step: &StepSpec,
        reason: String,
    ) -> Result<Flow, EngineError> {
        match self
            .retry
            .handle_failure(state, step.index, &reason, step.on_fail)
        {
            FailureAction::RetrySame => {
                self.persist(state).await?;
                self.emit(&PipelineEvent::StepRetrying {
                    index: step.index,
                    reason,
                });
                Ok(Flow::Continue)
            }
            FailureAction::BounceTo(target) => {
                // Decisions from the target onward are withdrawn; their
                // artifacts stay on disk until the re-run overwrites them
                for i in target..=step.index {
                    if let Some(record) = state.record_mut(i) {
                        record.clear();
                    }
                }
                state.current_step = target;
                self.persist(state).await?;
                self.emit(&PipelineEvent::StepBounced {
                    from: step.index,
                    to: target,
                    reason,
                });
                Ok(Flow::Continue)
            }
            FailureAction::Stop => {
                state.status = RunState::Failed {
                    step: step.index,
                    reason: reason.clone(),
                };
                self.persist(state).await?;
                self.emit(&PipelineEvent::PipelineFailed {
                    index: step.index,
                    reason,
                });
                Ok(Flow::Yield)
            }
        }
    }

    /// Failure reason to hand the executor when re-running a step, taken
    /// from the pending retry entry that points at it
    fn retry_reason_for(&self, state: &PipelineState, index: usize) -> Option<String> {
        state
            .retry_log
            .iter()
            .rev()
            .find(|e| {
                e.outcome == RetryOutcome::Pending
                    && (e.step_index == index
                        || self
                            .definition
                            .step(e.step_index)
                            .map(|s| s.on_fail == OnFail::BounceTo(index))
                            .unwrap_or(false))
            })
            .map(|e| e.reason.clone())
    }

    fn record_for<'a>(
        &self,
        state: &'a mut PipelineState,
        index: usize,
    ) -> Result<&'a mut StepRecord, EngineError> {
        state
            .record_mut(index)
            .ok_or_else(|| EngineError::InvalidState {
                operation: "advance".to_string(),
                state: format!("no record for step {index}"),
            })
    }

    async fn load(&self) -> Result<Option<PipelineState>, EngineError> {
        match self.store.read(PIPELINE_KEY).await? {
            Some(value) => {
                let state = serde_json::from_value(value).map_err(StoreError::from)?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn persist(&self, state: &PipelineState) -> Result<(), EngineError> {
        let value = serde_json::to_value(state).map_err(StoreError::from)?;
        self.store.write(PIPELINE_KEY, &value).await?;
        Ok(())
    }

    fn emit(&self, event: &PipelineEvent) {
        for handler in &self.handlers {
            handler(event);
        }
    }
}
