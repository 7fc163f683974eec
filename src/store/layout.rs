//! Workspace layout and state-record key naming
//!
//! State records and deliverable artifacts live in disjoint namespaces
//! under the workspace root, so resetting state while keeping deliverables
//! is a pure prefix deletion on the state side.

use std::path::{Path, PathBuf};

/// Key of the single pipeline record, owned by the orchestrator
///
/// Step indices start at 1, so the `00-` prefix never collides with a
/// step's records.
pub const PIPELINE_KEY: &str = "00-pipeline";

/// Default workspace directory, relative to the invocation directory
pub const DEFAULT_ROOT: &str = ".stagehand";

/// On-disk layout of a pipeline workspace
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a workspace rooted at `root`
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding state records
    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    /// Directory holding deliverable artifacts
    pub fn deliverable_dir(&self) -> PathBuf {
        self.root.join("deliverables")
    }

    /// Key of the main state record for a step
    pub fn step_key(&self, index: usize) -> String {
        format!("{:02}-step", index)
    }

    /// Key prefix shared by a step's main record and any suffix-qualified
    /// supplementary records
    pub fn step_prefix(&self, index: usize) -> String {
        format!("{:02}-", index)
    }

    /// Path of the file backing a state record key
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.state_dir().join(format!("{key}.json"))
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}
