//! Test: retry_once gives each step exactly one automatic recovery per run

use crate::helpers::*;
use stagehand::core::RetryOutcome;
use stagehand::RunState;

const RETRYING: &str = r#"
name: "Retrying"
steps:
  - name: "Fetch"
    command: "true"
    gate: none
    on_fail: retry_once

  - name: "Render"
    command: "true"
    gate: none
"#;

/// A single failure is retried immediately and the run continues
#[tokio::test]
async fn test_single_failure_is_retried() {
    let h = Harness::new(RETRYING, vec![Outcome::Error("network down"), Outcome::Pass]);

    let status = h.orchestrator.run().await.unwrap();
    assert_eq!(status, RunState::Completed);
    assert_eq!(h.invoked_steps(), vec![1, 1, 2]);

    // The retry attempt carried the failure reason to the worker
    let invocations = h.invocations();
    assert_eq!(invocations[0].retry_reason, None);
    assert!(invocations[1]
        .retry_reason
        .as_deref()
        .unwrap()
        .contains("network down"));

    let state = h.orchestrator.status().await.unwrap().unwrap();
    assert_eq!(state.retry_log.len(), 1);
    assert_eq!(state.retry_log[0].outcome, RetryOutcome::Resolved);
}

/// Failing the retry halts the run and records the exhausted attempt
#[tokio::test]
async fn test_failing_twice_halts() {
    let h = Harness::new(
        RETRYING,
        vec![Outcome::Error("broken"), Outcome::Error("still broken")],
    );

    let status = h.orchestrator.run().await.unwrap();
    match status {
        RunState::Failed { step, reason } => {
            assert_eq!(step, 1);
            assert!(reason.contains("still broken"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(h.invoked_steps(), vec![1, 1]);

    let state = h.orchestrator.status().await.unwrap().unwrap();
    assert_eq!(state.retry_log.len(), 1);
    assert_eq!(state.retry_log[0].outcome, RetryOutcome::Failed);
    // Step 2 never ran
    assert!(state.record(2).unwrap().decision.is_none());
}

/// Gate failures (missing state record) consume the budget like errors
#[tokio::test]
async fn test_gate_failure_consumes_the_budget() {
    let h = Harness::new(
        RETRYING,
        vec![Outcome::FailNoRecord, Outcome::FailNoRecord],
    );

    let status = h.orchestrator.run().await.unwrap();
    assert!(matches!(status, RunState::Failed { step: 1, .. }));
    assert_eq!(h.invoked_steps(), vec![1, 1]);
}

/// A step with no on_fail policy halts on its first failure
#[tokio::test]
async fn test_default_policy_is_stop() {
    let yaml = r#"
name: "No Policy"
steps:
  - name: "Only"
    command: "true"
    gate: none
"#;
    let h = Harness::new(yaml, vec![Outcome::Error("boom")]);

    let status = h.orchestrator.run().await.unwrap();
    assert!(matches!(status, RunState::Failed { step: 1, .. }));
    assert_eq!(h.invoked_steps(), vec![1]);

    // Stop consumes no retry budget, the log stays empty
    let state = h.orchestrator.status().await.unwrap().unwrap();
    assert!(state.retry_log.is_empty());
}
