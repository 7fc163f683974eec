//! Test: reset clears run state, optionally deliverables too

use crate::helpers::*;
use stagehand::{FsStateStore, RunState, StateStore};

const PRODUCING: &str = r#"
name: "Producing"
steps:
  - name: "Emit"
    command: "true"
    gate: none
    deliverables: ["out.txt"]
"#;

/// Plain reset forgets the run but keeps the artifacts
#[tokio::test]
async fn test_reset_state_keeps_deliverables() {
    let h = Harness::new(PRODUCING, vec![]);
    h.orchestrator.run().await.unwrap();
    assert!(h.deliverable("out.txt").exists());
    let first_run = h.orchestrator.status().await.unwrap().unwrap().run_id;

    let removed = h.orchestrator.reset_state().await.unwrap();
    // The pipeline record and the step record
    assert_eq!(removed, 2);
    assert!(h.orchestrator.status().await.unwrap().is_none());
    assert!(h.deliverable("out.txt").exists());

    let store = FsStateStore::new(h.workspace.state_dir());
    assert!(store.list("").await.unwrap().is_empty());

    // The next run is a brand new one
    let status = h.orchestrator.run().await.unwrap();
    assert_eq!(status, RunState::Completed);
    let second_run = h.orchestrator.status().await.unwrap().unwrap().run_id;
    assert_ne!(first_run, second_run);
}

/// Full reset removes the deliverable directory as well
#[tokio::test]
async fn test_reset_all_removes_deliverables() {
    let h = Harness::new(PRODUCING, vec![]);
    h.orchestrator.run().await.unwrap();
    assert!(h.deliverable("out.txt").exists());

    h.orchestrator.reset_all().await.unwrap();
    assert!(h.orchestrator.status().await.unwrap().is_none());
    assert!(!h.workspace.deliverable_dir().exists());
}

/// Resetting an empty workspace is a no-op, not an error
#[tokio::test]
async fn test_reset_before_any_run() {
    let h = Harness::new(PRODUCING, vec![]);
    assert_eq!(h.orchestrator.reset_state().await.unwrap(), 0);
    assert_eq!(h.orchestrator.reset_all().await.unwrap(), 0);
}
