//! Test: approval gates pause the run and decisions move it forward

use crate::helpers::*;
use stagehand::{ControlDecision, Decision, EngineError, RunState};

const MIXED_GATES: &str = r#"
name: "Mixed Gates"
steps:
  - name: "Draft"
    command: "true"
    gate: approval

  - name: "Compile"
    command: "true"
    gate: auto

  - name: "Publish"
    command: "true"
    gate: none
"#;

/// Approval pauses; auto yields control after committing; none chains
#[tokio::test]
async fn test_mixed_gate_walkthrough() {
    let h = Harness::new(MIXED_GATES, vec![]);

    // First invocation stops at the approval gate
    let status = h.orchestrator.run().await.unwrap();
    assert_eq!(status, RunState::Paused { step: 1 });
    assert_eq!(h.invoked_steps(), vec![1]);

    // The paused step has its output recorded but no decision yet
    let state = h.orchestrator.status().await.unwrap().unwrap();
    let record = state.record(1).unwrap();
    assert!(record.decision.is_none());
    assert!(record.running_since.is_none());
    assert_eq!(record.summary.as_deref(), Some("step 1 ok"));

    // Approving runs the auto-gated step, which yields control
    let status = h
        .orchestrator
        .apply_decision(ControlDecision::Approve)
        .await
        .unwrap();
    assert_eq!(status, RunState::Running);
    assert_eq!(h.invoked_steps(), vec![1, 2]);

    let state = h.orchestrator.status().await.unwrap().unwrap();
    assert_eq!(state.record(1).unwrap().decision, Some(Decision::Approved));
    assert_eq!(state.record(2).unwrap().decision, Some(Decision::Auto));

    // The final run covers the ungated step and completes
    let status = h.orchestrator.run().await.unwrap();
    assert_eq!(status, RunState::Completed);
    assert_eq!(h.invoked_steps(), vec![1, 2, 3]);
}

/// Revise re-runs the paused step with feedback; approving afterwards
/// records the decision as revised
#[tokio::test]
async fn test_revise_then_approve() {
    let h = Harness::new(MIXED_GATES, vec![]);

    h.orchestrator.run().await.unwrap();
    let status = h
        .orchestrator
        .apply_decision(ControlDecision::Revise {
            feedback: "tighten the intro".to_string(),
        })
        .await
        .unwrap();

    // Back at the same gate after the re-run
    assert_eq!(status, RunState::Paused { step: 1 });
    let invocations = h.invocations();
    assert_eq!(invocations.len(), 2);
    assert_eq!(invocations[0].feedback, None);
    assert_eq!(
        invocations[1].feedback.as_deref(),
        Some("tighten the intro")
    );

    let state = h.orchestrator.status().await.unwrap().unwrap();
    assert_eq!(state.record(1).unwrap().revisions, 1);

    h.orchestrator
        .apply_decision(ControlDecision::Approve)
        .await
        .unwrap();
    let state = h.orchestrator.status().await.unwrap().unwrap();
    assert_eq!(state.record(1).unwrap().decision, Some(Decision::Revised));
}

/// Skip resolves the paused step without re-running it
#[tokio::test]
async fn test_skip_resolves_without_rerun() {
    let h = Harness::new(MIXED_GATES, vec![]);

    h.orchestrator.run().await.unwrap();
    let status = h
        .orchestrator
        .apply_decision(ControlDecision::Skip)
        .await
        .unwrap();
    assert_eq!(status, RunState::Running);

    let state = h.orchestrator.status().await.unwrap().unwrap();
    assert_eq!(state.record(1).unwrap().decision, Some(Decision::Skipped));
    // Step 1 ran once, step 2 ran after the skip
    assert_eq!(h.invoked_steps(), vec![1, 2]);
}

/// Stop leaves the gate open for a later decision
#[tokio::test]
async fn test_stop_leaves_the_gate_open() {
    let h = Harness::new(MIXED_GATES, vec![]);

    h.orchestrator.run().await.unwrap();
    let status = h
        .orchestrator
        .apply_decision(ControlDecision::Stop)
        .await
        .unwrap();
    assert_eq!(status, RunState::Paused { step: 1 });
    assert_eq!(h.invoked_steps(), vec![1]);

    // The pipeline is still decidable afterwards
    let status = h
        .orchestrator
        .apply_decision(ControlDecision::Approve)
        .await
        .unwrap();
    assert_eq!(status, RunState::Running);
}

/// Decisions against a run that is not paused are invalid
#[tokio::test]
async fn test_decisions_require_a_paused_run() {
    let h = Harness::new(MIXED_GATES, vec![]);

    // Nothing has run yet
    let err = h
        .orchestrator
        .apply_decision(ControlDecision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
}
