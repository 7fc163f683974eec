//! Shell-command executor - runs each step's worker command as a subprocess

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::core::{StepContext, StepSpec};
use crate::executor::{ExecutionResult, ExecutorError, StepExecutor};

/// Executor that spawns each step's command through the shell
///
/// The step contract is passed through `STAGEHAND_*` environment variables;
/// stdout becomes the result summary. The worker is expected to write its
/// state record to `$STAGEHAND_STATE_RECORD` and deliverables under
/// `$STAGEHAND_DELIVERABLE_DIR` before exiting zero.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    /// Shell used to interpret step commands
    shell: String,
}

impl CommandExecutor {
    /// Create an executor using the given shell (e.g. "sh", "/bin/bash")
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new("sh")
    }
}

#[async_trait]
impl StepExecutor for CommandExecutor {
    async fn invoke(
        &self,
        step: &StepSpec,
        ctx: &StepContext,
    ) -> Result<ExecutionResult, ExecutorError> {
        debug!(step = step.index, command = %step.command, "spawning step command");

        // The worker writes into both directories; make sure they exist
        for dir in [&ctx.state_dir, &ctx.deliverable_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ExecutorError::Spawn(e.to_string()))?;
        }

        let params = serde_json::to_string(&ctx.parameters)
            .map_err(|e| ExecutorError::Internal(e.to_string()))?;

        let mut command = Command::new(&self.shell);
        command
            .args(["-c", &step.command])
            .env("STAGEHAND_STEP_INDEX", step.index.to_string())
            .env("STAGEHAND_STEP_NAME", &step.name)
            .env("STAGEHAND_STATE_DIR", &ctx.state_dir)
            .env("STAGEHAND_STATE_RECORD", &ctx.state_record)
            .env("STAGEHAND_DELIVERABLE_DIR", &ctx.deliverable_dir)
            .env("STAGEHAND_PARAMS", params)
            .kill_on_drop(true);

        if let Some(feedback) = &ctx.feedback {
            command.env("STAGEHAND_FEEDBACK", feedback);
        }
        if let Some(reason) = &ctx.retry_reason {
            command.env("STAGEHAND_RETRY_REASON", reason);
        }

        let result = timeout(Duration::from_secs(step.timeout_secs), command.output())
            .await
            .map_err(|_| ExecutorError::Timeout(step.timeout_secs))?;

        let output = result.map_err(|e| ExecutorError::Spawn(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(
                step = step.index,
                exit_code,
                "step command failed: {}",
                stderr.trim()
            );
            return Err(ExecutorError::NonZeroExit {
                code: exit_code,
                stderr: stderr.trim().to_string(),
            });
        }

        let summary = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(step = step.index, bytes = summary.len(), "step command finished");

        // Declared deliverables, resolved against the deliverable root,
        // become the recorded list the gate checks and revert purges
        let deliverables = step
            .deliverables
            .iter()
            .map(|p| {
                if p.is_absolute() {
                    p.clone()
                } else {
                    ctx.deliverable_dir.join(p)
                }
            })
            .collect();

        Ok(ExecutionResult {
            summary,
            deliverables,
        })
    }
}
