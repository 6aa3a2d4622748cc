//! Scenario: happy path, two shards, one worker.
//!
//! GREEN when:
//! - The worker acquires the lock, runs both shards to success, publishes
//!   {state: succeeded, terminal: true, counts: {succeeded: 2, total: 2}},
//!   and releases the lock.
//! - The DLQ stays empty and each shard's event trail contains queued,
//!   running, and succeeded entries.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use sfb_config::WorkerConfig;
use sfb_schemas::keys::{RunScope, DEFAULT_LOCK_KEY};
use sfb_schemas::run::{RunState, RunStatusDoc};
use sfb_schemas::worker::{WorkerState, WorkerStatusDoc};
use sfb_store::{get_json, ObjectStore};
use sfb_testkit::{MemoryStore, ScriptedRunner};
use sfb_worker::QueueWorker;

const UUID: &str = "0123456789abcdef0123456789abcdef";

fn test_config(shards_json: &str) -> WorkerConfig {
    WorkerConfig {
        bucket: "bench-bucket".into(),
        run_id: "1754000000".into(),
        benchmark_uuid: UUID.into(),
        lock_owner: "gha-42".into(),
        lock_key: DEFAULT_LOCK_KEY.into(),
        shards_json_b64: base64::engine::general_purpose::STANDARD.encode(shards_json),
        max_parallel_instances: 1,
        shard_max_attempts: 3,
        lock_lease_seconds: 900,
        lock_heartbeat_seconds: 60,
        lock_acquire_timeout_seconds: 0,
        poll_seconds: 5,
        idle_polls_before_exit: 6,
        fuzzers_dir: "/nonexistent/fuzzers".into(),
        work_dir: "/nonexistent/work".into(),
        log_dir: "/nonexistent/logs".into(),
        aws_profile: None,
    }
}

#[tokio::test]
async fn two_shards_succeed_and_lock_is_released() {
    let store = MemoryStore::new();
    let runner = Arc::new(ScriptedRunner::new(0));
    let config = test_config(
        r#"[
            {"shard_key":"shard-a","fuzzer_key":"echidna","run_index":0},
            {"shard_key":"shard-b","fuzzer_key":"medusa","run_index":0}
        ]"#,
    );
    let scope = RunScope::new(config.run_id.clone(), config.benchmark_uuid.clone());

    let mut worker = QueueWorker::new(
        Arc::new(store.clone()),
        runner.clone(),
        config,
        "w1",
        "test-host",
    );
    worker.set_claim_settle_delay(Duration::ZERO);
    worker.run().await.unwrap();

    // Run status is terminal success with both shards counted.
    let run_status: RunStatusDoc = get_json(&store, &scope.run_status_key())
        .await
        .unwrap()
        .expect("run status must exist");
    assert_eq!(run_status.state, RunState::Succeeded);
    assert!(run_status.terminal);
    assert_eq!(run_status.counts.succeeded, 2);
    assert_eq!(run_status.counts.total, 2);
    assert_eq!(run_status.requested_shards, 2);
    assert!(run_status.completed_at.is_some());

    // Lock released; nothing dead-lettered.
    assert!(!store.contains(DEFAULT_LOCK_KEY));
    assert!(store.list(&scope.dlq_prefix()).await.unwrap().is_empty());

    // Each shard ran exactly once, in key order.
    assert_eq!(
        runner.invocations(),
        vec![("shard-a".to_string(), 1), ("shard-b".to_string(), 1)]
    );

    // Event trail per shard: queued, running, succeeded.
    let events = store.list(&scope.event_prefix()).await.unwrap();
    for shard in ["shard-a", "shard-b"] {
        for status in ["queued", "running", "succeeded"] {
            let marker = format!("-{shard}-{status}-");
            assert_eq!(
                events.iter().filter(|k| k.contains(&marker)).count(),
                1,
                "expected exactly one {status} event for {shard}"
            );
        }
    }

    // The worker parked itself as stopped.
    let worker_status: WorkerStatusDoc = get_json(&store, &scope.worker_status_key("w1"))
        .await
        .unwrap()
        .expect("worker status must exist");
    assert_eq!(worker_status.state, WorkerState::Stopped);
}
