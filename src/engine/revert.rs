//! Revert: rewind the pipeline to an earlier step and purge its wake
//!
//! Reverting to step k clears every record and deliverable for steps >= k
//! and leaves steps < k untouched, so re-running from k starts from a
//! clean slate.

use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::core::{PipelineDefinition, PipelineState};
use crate::engine::EngineError;
use crate::store::{StateStore, Workspace};

/// A revert target as given by the caller, before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertTarget {
    /// 1-based step index
    Index(usize),
    /// Step display name, matched case-sensitively
    Name(String),
}

impl FromStr for RevertTarget {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<usize>() {
            Ok(index) => Ok(RevertTarget::Index(index)),
            Err(_) => Ok(RevertTarget::Name(s.to_string())),
        }
    }
}

impl fmt::Display for RevertTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevertTarget::Index(i) => write!(f, "{i}"),
            RevertTarget::Name(n) => write!(f, "{n}"),
        }
    }
}

/// Resolves revert targets and applies the purge
#[derive(Debug, Default)]
pub struct RevertManager;

impl RevertManager {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a target to a 1-based step index
    ///
    /// An index must be within bounds; a name must match exactly one step.
    pub fn resolve(
        &self,
        definition: &PipelineDefinition,
        target: &RevertTarget,
    ) -> Result<usize, EngineError> {
        match target {
            RevertTarget::Index(index) => {
                if *index >= 1 && *index <= definition.len() {
                    Ok(*index)
                } else {
                    Err(EngineError::UnknownStep(target.to_string()))
                }
            }
            RevertTarget::Name(name) => {
                let matches = definition.steps_named(name);
                match matches.as_slice() {
                    [step] => Ok(step.index),
                    _ => Err(EngineError::UnknownStep(target.to_string())),
                }
            }
        }
    }

    /// Clear state records and deliverables for steps >= index, then move
    /// the cursor there
    pub async fn apply(
        &self,
        state: &mut PipelineState,
        store: &dyn StateStore,
        workspace: &Workspace,
        index: usize,
    ) -> Result<(), EngineError> {
        info!(target = index, "reverting pipeline");

        let total = state.steps.len();
        for i in index..=total {
            if let Some(record) = state.record(i) {
                for path in record.deliverables.clone() {
                    match tokio::fs::remove_file(&path).await {
                        Ok(()) => {}
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                        Err(e) => return Err(EngineError::Store(e.into())),
                    }
                }
            }
            store.delete_prefix(&workspace.step_prefix(i)).await?;
            if let Some(record) = state.record_mut(i) {
                record.clear();
            }
        }

        state.current_step = index;
        Ok(())
    }
}
