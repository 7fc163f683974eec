//! Post-step validation
//!
//! The gate engine is a stateless validator: it reads the state store and
//! the filesystem, never writes either. All criteria are evaluated so one
//! report explains everything wrong with a step, not just the first thing.

use tokio::process::Command;
use tracing::debug;

use crate::core::StepSpec;
use crate::executor::ExecutionResult;
use crate::store::{StateStore, StoreError, Workspace};

/// Result of validating one step's execution
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub pass: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            pass: errors.is_empty(),
            errors,
        }
    }

    /// Collapse the error list into one reason string
    pub fn reason(&self) -> String {
        self.errors.join("; ")
    }
}

/// Stateless gate validator
#[derive(Debug, Default)]
pub struct GateEngine;

impl GateEngine {
    pub fn new() -> Self {
        Self
    }

    /// Validate a step's execution result
    ///
    /// Criteria, all mandatory: (a) the step's state record exists, (b)
    /// every reported deliverable path is present, (c) the configured check
    /// command, if any, exits zero. Failures accumulate; only store errors
    /// abort validation.
    pub async fn validate(
        &self,
        step: &StepSpec,
        result: &ExecutionResult,
        store: &dyn StateStore,
        workspace: &Workspace,
    ) -> Result<ValidationOutcome, StoreError> {
        let mut errors = Vec::new();

        let record_key = workspace.step_key(step.index);
        if !store.exists(&record_key).await? {
            errors.push(format!(
                "state record '{record_key}' missing: the executor did not write it"
            ));
        }

        for path in &result.deliverables {
            let present = tokio::fs::try_exists(path).await.unwrap_or(false);
            if !present {
                errors.push(format!("deliverable missing: {}", path.display()));
            }
        }

        if let Some(check) = &step.check {
            match Command::new("sh").args(["-c", check]).output().await {
                Ok(output) if output.status.success() => {}
                Ok(output) => {
                    let code = output.status.code().unwrap_or(-1);
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    errors.push(format!(
                        "check command failed with code {code}: {}",
                        stderr.trim()
                    ));
                }
                Err(e) => {
                    errors.push(format!("check command could not run: {e}"));
                }
            }
        }

        debug!(
            step = step.index,
            pass = errors.is_empty(),
            errors = errors.len(),
            "gate validated"
        );
        Ok(ValidationOutcome::from_errors(errors))
    }
}
