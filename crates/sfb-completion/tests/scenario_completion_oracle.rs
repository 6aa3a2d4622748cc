//! Completion oracle verdicts.
//!
//! GREEN when:
//! - A terminal status object wins immediately (status_terminal).
//! - Without a manifest the run is incomplete (manifest_missing), even when
//!   run_id is also unparseable.
//! - A non-numeric run_id with a manifest present is invalid_run_id.
//! - The deadline fallback honors timeout_hours plus grace, inclusively.
//! - The legacy manifest location still counts.
//! - Discover returns complete runs newest first.

use serde_json::json;
use sfb_completion::{check_run_completion, discover_complete_runs, CompletionReason};
use sfb_schemas::keys::RunScope;
use sfb_store::put_json;
use sfb_testkit::MemoryStore;

const UUID_A: &str = "0123456789abcdef0123456789abcdef";
const UUID_B: &str = "fedcba9876543210fedcba9876543210";

fn scope(run_id: &str, uuid: &str) -> RunScope {
    RunScope::new(run_id, uuid)
}

#[tokio::test]
async fn terminal_status_completes_immediately() {
    let store = MemoryStore::new();
    let scope = scope("1754000000", UUID_A);
    put_json(
        &store,
        &scope.run_status_key(),
        &json!({"state": "succeeded", "terminal": true, "mode": "s3_queue"}),
    )
    .await
    .unwrap();

    let verdict = check_run_completion(&store, &scope, 3600, Some(1754000100))
        .await
        .unwrap();
    assert!(verdict.complete);
    assert_eq!(verdict.reason, CompletionReason::StatusTerminal);
    assert!(verdict.queue_mode);
    assert!(verdict.status_terminal);
    assert_eq!(verdict.status_state, "succeeded");
}

#[tokio::test]
async fn legacy_terminal_state_without_flag_still_counts() {
    let store = MemoryStore::new();
    let scope = scope("1754000000", UUID_A);
    put_json(
        &store,
        &scope.run_status_key(),
        &json!({"state": "completed"}),
    )
    .await
    .unwrap();

    let verdict = check_run_completion(&store, &scope, 0, Some(0)).await.unwrap();
    assert!(verdict.complete);
    assert_eq!(verdict.reason, CompletionReason::StatusTerminal);
}

#[tokio::test]
async fn missing_manifest_beats_invalid_run_id() {
    let store = MemoryStore::new();
    let scope = scope("not-a-number", UUID_A);

    let verdict = check_run_completion(&store, &scope, 3600, Some(0)).await.unwrap();
    assert!(!verdict.complete);
    assert_eq!(verdict.reason, CompletionReason::ManifestMissing);
}

#[tokio::test]
async fn invalid_run_id_with_manifest_present() {
    let store = MemoryStore::new();
    let scope = scope("not-a-number", UUID_A);
    put_json(&store, &scope.manifest_key(), &json!({"timeout_hours": 1}))
        .await
        .unwrap();

    let verdict = check_run_completion(&store, &scope, 3600, Some(0)).await.unwrap();
    assert!(!verdict.complete);
    assert_eq!(verdict.reason, CompletionReason::InvalidRunId);
}

#[tokio::test]
async fn deadline_fallback_is_inclusive() {
    let store = MemoryStore::new();
    let scope = scope("1754000000", UUID_A);
    put_json(&store, &scope.manifest_key(), &json!({"timeout_hours": 1}))
        .await
        .unwrap();

    // deadline = start + 3600 (timeout) + 600 (grace)
    let deadline = 1754000000 + 3600 + 600;

    let pending = check_run_completion(&store, &scope, 600, Some(deadline - 1))
        .await
        .unwrap();
    assert!(!pending.complete);
    assert_eq!(pending.reason, CompletionReason::DeadlinePending);
    assert_eq!(pending.timeout_hours, Some(1.0));

    let met = check_run_completion(&store, &scope, 600, Some(deadline))
        .await
        .unwrap();
    assert!(met.complete);
    assert_eq!(met.reason, CompletionReason::DeadlineMet);
}

#[tokio::test]
async fn legacy_manifest_location_is_honored() {
    let store = MemoryStore::new();
    let scope = scope("1754000000", UUID_A);
    put_json(
        &store,
        &scope.legacy_manifest_key(),
        &json!({"timeout_hours": 1}),
    )
    .await
    .unwrap();

    let verdict = check_run_completion(&store, &scope, 0, Some(1754000000 + 3600))
        .await
        .unwrap();
    assert!(verdict.complete);
    assert_eq!(verdict.reason, CompletionReason::DeadlineMet);
}

#[tokio::test]
async fn discover_returns_complete_runs_newest_first() {
    let store = MemoryStore::new();
    let now = 1754010000;

    // Older run: terminal status → complete.
    let old = scope("1753000000", UUID_B);
    put_json(&store, &old.manifest_key(), &json!({"timeout_hours": 24}))
        .await
        .unwrap();
    put_json(
        &store,
        &old.run_status_key(),
        &json!({"state": "failed", "terminal": true}),
    )
    .await
    .unwrap();

    // Newer run: past its deadline → complete.
    let newer = scope("1754000000", UUID_A);
    put_json(&store, &newer.manifest_key(), &json!({"timeout_hours": 1}))
        .await
        .unwrap();

    // Newest run: still inside its budget → incomplete.
    let newest = scope("1754009000", UUID_B);
    put_json(&store, &newest.manifest_key(), &json!({"timeout_hours": 24}))
        .await
        .unwrap();

    let complete = discover_complete_runs(&store, 0, Some(now)).await.unwrap();
    let ids: Vec<&str> = complete.iter().map(|c| c.run_id.as_str()).collect();
    assert_eq!(ids, vec!["1754000000", "1753000000"]);
}
