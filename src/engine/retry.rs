//! Retry accounting
//!
//! Each step gets at most one automatic recovery attempt per run, counted
//! in the append-only retry log. The count never resets: a step that was
//! bailed out once and fails again later halts the pipeline.

use tracing::{info, warn};

use crate::core::{OnFail, PipelineDefinition, PipelineState, RetryEntry, RetryOutcome};

/// What the orchestrator should do after a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Re-run the failing step immediately
    RetrySame,
    /// Rewind the cursor to an earlier step and re-run from there
    BounceTo(usize),
    /// Halt the pipeline
    Stop,
}

/// Applies failure policies against the retry ceiling
#[derive(Debug, Default)]
pub struct RetryCoordinator;

impl RetryCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// Decide the recovery action for a failed step and record it
    ///
    /// Retry and bounce append a `Pending` log entry; `Stop` halts without
    /// consuming the budget. When an entry already exists for the step the
    /// ceiling is reached: the entry is marked `Failed` and the pipeline
    /// halts whatever the policy says.
    pub fn handle_failure(
        &self,
        state: &mut PipelineState,
        step_index: usize,
        reason: &str,
        policy: OnFail,
    ) -> FailureAction {
        if state.retry_count(step_index) >= 1 {
            warn!(step = step_index, "retry ceiling reached, halting");
            if let Some(entry) = state
                .retry_log
                .iter_mut()
                .rev()
                .find(|e| e.step_index == step_index && e.outcome == RetryOutcome::Pending)
            {
                entry.outcome = RetryOutcome::Failed;
            }
            return FailureAction::Stop;
        }

        match policy {
            OnFail::RetryOnce => {
                info!(step = step_index, reason, "retrying step once");
                state.retry_log.push(RetryEntry {
                    step_index,
                    attempt: 1,
                    reason: reason.to_string(),
                    outcome: RetryOutcome::Pending,
                });
                FailureAction::RetrySame
            }
            OnFail::BounceTo(target) => {
                info!(
                    step = step_index,
                    target, reason, "bouncing back to earlier step"
                );
                state.retry_log.push(RetryEntry {
                    step_index,
                    attempt: 1,
                    reason: reason.to_string(),
                    outcome: RetryOutcome::Pending,
                });
                FailureAction::BounceTo(target)
            }
            OnFail::Stop => {
                warn!(step = step_index, reason, "stop policy, halting");
                FailureAction::Stop
            }
        }
    }

    /// Resolve the pending retry entry satisfied by a step passing its gate
    ///
    /// A retry entry resolves when its own step passes. A bounce entry
    /// resolves as soon as the bounced-to target passes, whatever happens
    /// to the bouncing step afterwards. Resolved entries stay in the log
    /// and still count toward the ceiling.
    pub fn mark_resolved(
        &self,
        definition: &PipelineDefinition,
        state: &mut PipelineState,
        passed_index: usize,
    ) {
        if let Some(entry) = state.retry_log.iter_mut().rev().find(|e| {
            e.outcome == RetryOutcome::Pending
                && (e.step_index == passed_index
                    || definition
                        .step(e.step_index)
                        .map(|s| s.on_fail == OnFail::BounceTo(passed_index))
                        .unwrap_or(false))
        }) {
            entry.outcome = RetryOutcome::Resolved;
        }
    }
}
