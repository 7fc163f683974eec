//! Execution context handed to the step executor

use std::collections::HashMap;
use std::path::PathBuf;

use crate::core::state::{PipelineState, StepRecord};

/// Reference to an already-resolved earlier step
#[derive(Debug, Clone)]
pub struct PriorStep {
    pub index: usize,
    pub summary: Option<String>,
    pub deliverables: Vec<PathBuf>,
}

impl PriorStep {
    fn from_record(record: &StepRecord) -> Self {
        Self {
            index: record.index,
            summary: record.summary.clone(),
            deliverables: record.deliverables.clone(),
        }
    }
}

/// Everything an executor needs to run one step
///
/// The executor is responsible for writing its own state record at
/// `state_record` and its deliverables under `deliverable_dir` before
/// returning, and must do so idempotently: recovery is at-least-once.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Resolved parameters, fixed at run creation
    pub parameters: HashMap<String, String>,

    /// Resolved earlier steps, in order
    pub prior_steps: Vec<PriorStep>,

    /// Revision feedback, set when the step is re-invoked by a `Revise`
    pub feedback: Option<String>,

    /// Failure reason from the pending retry entry, set when the step is
    /// re-invoked by a retry or a bounce-back
    pub retry_reason: Option<String>,

    /// Directory holding state records
    pub state_dir: PathBuf,

    /// Directory holding deliverable artifacts
    pub deliverable_dir: PathBuf,

    /// Exact path where the executor must write its step record
    pub state_record: PathBuf,
}

impl StepContext {
    /// Build a context for a step from the current pipeline state
    pub fn for_step(
        state: &PipelineState,
        step_index: usize,
        state_dir: PathBuf,
        deliverable_dir: PathBuf,
        state_record: PathBuf,
    ) -> Self {
        let prior_steps = state
            .steps
            .iter()
            .filter(|r| r.index < step_index && r.is_resolved())
            .map(PriorStep::from_record)
            .collect();

        Self {
            parameters: state.parameters.clone(),
            prior_steps,
            feedback: None,
            retry_reason: None,
            state_dir,
            deliverable_dir,
            state_record,
        }
    }

    /// Attach revision feedback
    pub fn with_feedback(mut self, feedback: String) -> Self {
        self.feedback = Some(feedback);
        self
    }

    /// Attach a retry/bounce failure reason
    pub fn with_retry_reason(mut self, reason: String) -> Self {
        self.retry_reason = Some(reason);
        self
    }
}
