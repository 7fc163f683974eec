//! Executor result and error types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Error types for executor operations
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("failed to spawn step command: {0}")]
    Spawn(String),

    #[error("step timed out after {0} seconds")]
    Timeout(u64),

    #[error("step command exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("internal executor error: {0}")]
    Internal(String),
}

/// What an executor produced for one step
///
/// The step's own state record is not part of this result; the executor
/// writes it durably before returning and the gate read-validates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Human-readable summary of what the step did
    pub summary: String,

    /// Deliverable paths the step produced, already resolved
    pub deliverables: Vec<PathBuf>,
}

impl ExecutionResult {
    /// Create a result with no deliverables
    pub fn new(summary: String) -> Self {
        Self {
            summary,
            deliverables: Vec::new(),
        }
    }
}
