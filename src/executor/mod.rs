//! Step executor boundary
//!
//! The orchestrator only needs to know whether a step produced the expected
//! artifacts; how the work happens lives behind [`StepExecutor`]. The
//! bundled [`CommandExecutor`] runs worker commands through the shell.

pub mod command;
pub mod result;

use async_trait::async_trait;

use crate::core::{StepContext, StepSpec};
pub use command::CommandExecutor;
pub use result::{ExecutionResult, ExecutorError};

/// Trait for step execution - allows for different implementations
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Run one step to completion and report what it produced
    ///
    /// Implementations must write the step's state record at
    /// `ctx.state_record` and any deliverables under `ctx.deliverable_dir`
    /// before returning, idempotently: the orchestrator re-invokes steps
    /// whose completion it cannot prove.
    async fn invoke(
        &self,
        step: &StepSpec,
        ctx: &StepContext,
    ) -> Result<ExecutionResult, ExecutorError>;
}
