//! Orchestration state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

use crate::core::pipeline::PipelineDefinition;

/// Overall pipeline run status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Pipeline has been created but no step has started
    NotStarted,
    /// Pipeline is actively executing steps
    Running,
    /// Pipeline is paused at an approval gate, awaiting an external decision
    Paused { step: usize },
    /// Every step carries a terminal decision
    Completed,
    /// A step exhausted its recovery budget
    Failed { step: usize, reason: String },
}

impl RunState {
    /// Check if the run is in a terminal state for this invocation
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed { .. })
    }

    /// Check if the run is paused awaiting a decision
    pub fn is_paused(&self) -> bool {
        matches!(self, RunState::Paused { .. })
    }

    /// Short display name for logs and CLI output
    pub fn name(&self) -> &'static str {
        match self {
            RunState::NotStarted => "not-started",
            RunState::Running => "running",
            RunState::Paused { .. } => "paused",
            RunState::Completed => "completed",
            RunState::Failed { .. } => "failed",
        }
    }
}

/// Terminal decision recorded for a step once its gate resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Passed validation and was explicitly approved
    Approved,
    /// Passed validation at an automatic gate
    Auto,
    /// Approved after at least one revision cycle
    Revised,
    /// Skipped by an explicit decision, gate criteria not required
    Skipped,
}

/// Per-step progress record
///
/// `decision` stays unset while the step is pending. `running_since` is set
/// and persisted immediately before the executor is invoked so a crash
/// mid-execution is observable on the next resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based step index
    pub index: usize,

    /// Terminal decision, unset while pending
    pub decision: Option<Decision>,

    /// Set while the executor is (believed to be) running
    pub running_since: Option<DateTime<Utc>>,

    /// When the terminal decision was committed
    pub completed_at: Option<DateTime<Utc>>,

    /// Executor-provided summary of what the step produced
    pub summary: Option<String>,

    /// Deliverable paths reported by the executor, recorded for revert
    pub deliverables: Vec<PathBuf>,

    /// Number of revision cycles applied at the approval gate
    pub revisions: u32,
}

impl StepRecord {
    /// Create an unset record for a step
    pub fn new(index: usize) -> Self {
        Self {
            index,
            decision: None,
            running_since: None,
            completed_at: None,
            summary: None,
            deliverables: Vec::new(),
            revisions: 0,
        }
    }

    /// Check if the step carries a terminal decision
    pub fn is_resolved(&self) -> bool {
        self.decision.is_some()
    }

    /// Reset the record to its pending state, keeping only the index
    pub fn clear(&mut self) {
        *self = StepRecord::new(self.index);
    }
}

/// Outcome of a recorded retry attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryOutcome {
    /// Attempt issued, step has not passed or failed again yet
    Pending,
    /// The failing step later passed its gate
    Resolved,
    /// The step failed again, the ceiling stopped the pipeline
    Failed,
}

/// One entry in the append-only retry log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryEntry {
    pub step_index: usize,
    pub attempt: u32,
    pub reason: String,
    pub outcome: RetryOutcome,
}

/// The single record of orchestration progress
///
/// Owned exclusively by the orchestrator and persisted after every state
/// transition, so an external process can kill the host at any point
/// without losing progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique run ID
    pub run_id: Uuid,

    /// When the run was first created
    pub started_at: DateTime<Utc>,

    /// Current run status
    pub status: RunState,

    /// 1-based cursor of the step to execute next
    pub current_step: usize,

    /// Resolved parameters, fixed at creation
    pub parameters: HashMap<String, String>,

    /// Exactly one record per defined step
    pub steps: Vec<StepRecord>,

    /// Append-only retry log, empty when no retries have occurred
    pub retry_log: Vec<RetryEntry>,
}

impl PipelineState {
    /// Create a fresh state for a definition: cursor at 1, all records unset
    pub fn new(definition: &PipelineDefinition, parameters: HashMap<String, String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            status: RunState::NotStarted,
            current_step: 1,
            parameters,
            steps: definition
                .steps()
                .iter()
                .map(|s| StepRecord::new(s.index))
                .collect(),
            retry_log: Vec::new(),
        }
    }

    /// Get the record for a 1-based step index
    pub fn record(&self, index: usize) -> Option<&StepRecord> {
        self.steps.get(index.checked_sub(1)?)
    }

    /// Get a mutable record for a 1-based step index
    pub fn record_mut(&mut self, index: usize) -> Option<&mut StepRecord> {
        self.steps.get_mut(index.checked_sub(1)?)
    }

    /// First step without a terminal decision, if any
    pub fn first_unresolved(&self) -> Option<usize> {
        self.steps.iter().find(|r| !r.is_resolved()).map(|r| r.index)
    }

    /// Number of retry attempts recorded for a step, regardless of outcome
    pub fn retry_count(&self, step_index: usize) -> usize {
        self.retry_log
            .iter()
            .filter(|e| e.step_index == step_index)
            .count()
    }

    /// The pending retry entry for a step, if one exists
    pub fn pending_retry(&self, step_index: usize) -> Option<&RetryEntry> {
        self.retry_log
            .iter()
            .rev()
            .find(|e| e.step_index == step_index && e.outcome == RetryOutcome::Pending)
    }
}
