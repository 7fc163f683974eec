//! Pipeline definition domain model

use std::collections::HashMap;
use std::path::PathBuf;

/// Gate type applied after a step's validation passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Pause and wait for an external decision
    Approval,
    /// Commit automatically but return control to the caller
    Auto,
    /// Commit automatically and continue straight into the next step
    None,
}

/// Failure policy applied when a step's validation fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFail {
    /// Re-run the same step once
    RetryOnce,
    /// Rewind the cursor to an earlier step and re-run from there
    BounceTo(usize),
    /// Halt the pipeline
    Stop,
}

/// One step of a resolved pipeline definition
#[derive(Debug, Clone)]
pub struct StepSpec {
    /// 1-based index, contiguous across the definition
    pub index: usize,

    /// Display name, used for revert target resolution
    pub name: String,

    /// Worker command executed for this step
    pub command: String,

    /// Gate applied after validation
    pub gate: Gate,

    /// Failure policy, `Stop` when not configured
    pub on_fail: OnFail,

    /// Deliverable paths the step must produce, relative to the
    /// deliverable root
    pub deliverables: Vec<PathBuf>,

    /// Optional external check command that must exit zero
    pub check: Option<String>,

    /// Executor timeout in seconds
    pub timeout_secs: u64,
}

/// An immutable, validated pipeline definition
///
/// Loaded once from configuration; never mutated at runtime.
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    name: String,
    parameters: HashMap<String, String>,
    steps: Vec<StepSpec>,
}

impl PipelineDefinition {
    pub(crate) fn new(
        name: String,
        parameters: HashMap<String, String>,
        steps: Vec<StepSpec>,
    ) -> Self {
        Self {
            name,
            parameters,
            steps,
        }
    }

    /// Pipeline name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters declared in the definition
    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    /// All steps in execution order
    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the definition has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Get a step by its 1-based index
    pub fn step(&self, index: usize) -> Option<&StepSpec> {
        self.steps.get(index.checked_sub(1)?)
    }

    /// Find steps whose display name matches exactly (case-sensitive)
    pub fn steps_named(&self, name: &str) -> Vec<&StepSpec> {
        self.steps.iter().filter(|s| s.name == name).collect()
    }
}
