//! Test utility functions for stagehand scenarios

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use stagehand::core::StepContext;
use stagehand::executor::{ExecutionResult, ExecutorError, StepExecutor};
use stagehand::{FsStateStore, Orchestrator, PipelineConfig, StepSpec, Workspace};

/// One scripted executor outcome, consumed per invocation
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Write the state record and declared deliverables, then succeed
    Pass,
    /// Return without writing the state record, so the gate fails
    FailNoRecord,
    /// Fail like a worker that exited nonzero
    Error(&'static str),
}

/// What the executor saw on one invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub step: usize,
    pub feedback: Option<String>,
    pub retry_reason: Option<String>,
}

/// Executor that follows a script of outcomes, defaulting to `Pass` once
/// the script runs out
pub struct MockExecutor {
    script: Mutex<VecDeque<Outcome>>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

#[async_trait]
impl StepExecutor for MockExecutor {
    async fn invoke(
        &self,
        step: &StepSpec,
        ctx: &StepContext,
    ) -> Result<ExecutionResult, ExecutorError> {
        self.invocations.lock().unwrap().push(Invocation {
            step: step.index,
            feedback: ctx.feedback.clone(),
            retry_reason: ctx.retry_reason.clone(),
        });

        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Pass);

        match outcome {
            Outcome::Pass => {
                std::fs::create_dir_all(&ctx.state_dir).unwrap();
                std::fs::write(&ctx.state_record, "{}").unwrap();

                let mut deliverables = Vec::new();
                for path in &step.deliverables {
                    let resolved = if path.is_absolute() {
                        path.clone()
                    } else {
                        ctx.deliverable_dir.join(path)
                    };
                    if let Some(parent) = resolved.parent() {
                        std::fs::create_dir_all(parent).unwrap();
                    }
                    std::fs::write(&resolved, "artifact").unwrap();
                    deliverables.push(resolved);
                }

                Ok(ExecutionResult {
                    summary: format!("step {} ok", step.index),
                    deliverables,
                })
            }
            Outcome::FailNoRecord => {
                let _ = std::fs::remove_file(&ctx.state_record);
                Ok(ExecutionResult::new(String::new()))
            }
            Outcome::Error(stderr) => Err(ExecutorError::NonZeroExit {
                code: 1,
                stderr: stderr.to_string(),
            }),
        }
    }
}

/// A pipeline wired to a mock executor over a temporary workspace
pub struct Harness {
    pub dir: TempDir,
    pub orchestrator: Orchestrator<MockExecutor, FsStateStore>,
    pub workspace: Workspace,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl Harness {
    pub fn new(yaml: &str, script: Vec<Outcome>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, workspace, invocations) = orchestrator_at(dir.path(), yaml, script);
        Self {
            dir,
            orchestrator,
            workspace,
            invocations,
        }
    }

    /// A second orchestrator over the same workspace, simulating a fresh
    /// process picking up the durable state
    pub fn reopen(
        &self,
        yaml: &str,
        script: Vec<Outcome>,
    ) -> (Orchestrator<MockExecutor, FsStateStore>, Arc<Mutex<Vec<Invocation>>>) {
        let (orchestrator, _, invocations) = orchestrator_at(self.dir.path(), yaml, script);
        (orchestrator, invocations)
    }

    /// Step indices in invocation order
    pub fn invoked_steps(&self) -> Vec<usize> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.step)
            .collect()
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn deliverable(&self, name: &str) -> std::path::PathBuf {
        self.workspace.deliverable_dir().join(name)
    }
}

pub fn orchestrator_at(
    root: &Path,
    yaml: &str,
    script: Vec<Outcome>,
) -> (
    Orchestrator<MockExecutor, FsStateStore>,
    Workspace,
    Arc<Mutex<Vec<Invocation>>>,
) {
    let definition = PipelineConfig::from_yaml(yaml).unwrap().resolve().unwrap();
    let workspace = Workspace::new(root);
    let store = FsStateStore::new(workspace.state_dir());
    let invocations = Arc::new(Mutex::new(Vec::new()));
    let executor = MockExecutor {
        script: Mutex::new(script.into()),
        invocations: invocations.clone(),
    };
    let orchestrator = Orchestrator::new(definition, executor, store, workspace.clone());
    (orchestrator, workspace, invocations)
}
