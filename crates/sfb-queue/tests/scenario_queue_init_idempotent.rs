//! Initializer idempotence.
//!
//! GREEN when:
//! - First run creates every shard as queued with attempt 0 and emits one
//!   queued event per shard.
//! - Re-running after a shard progressed preserves its status and attempt
//!   and creates nothing.

use std::time::Duration;

use sfb_queue::{claim_next, complete_shard, initialize_queue, parse_shards_json, ClaimSettings};
use sfb_schemas::keys::RunScope;
use sfb_schemas::run::RunState;
use sfb_schemas::shard::{ShardDoc, ShardStatus};
use sfb_schemas::time::{epoch_now, utc_now};
use sfb_status::events::EventScribe;
use sfb_status::run::RunStatusInputs;
use sfb_store::{get_json, ObjectStore};
use sfb_testkit::MemoryStore;

fn scope() -> RunScope {
    RunScope::new("1754000000", "0123456789abcdef0123456789abcdef")
}

fn inputs() -> RunStatusInputs {
    RunStatusInputs {
        lock_owner: "gha-1".to_string(),
        max_parallel_instances: 1,
        shard_max_attempts: 3,
    }
}

fn claim_settings() -> ClaimSettings {
    ClaimSettings {
        default_max_attempts: 3,
        settle_delay: Duration::ZERO,
    }
}

const SHARDS: &str = r#"[
    {"shard_key":"echidna-0","fuzzer_key":"echidna","run_index":0},
    {"shard_key":"medusa-0","fuzzer_key":"medusa","run_index":0}
]"#;

#[tokio::test]
async fn initializer_is_idempotent() {
    let store = MemoryStore::new();
    let scope = scope();
    let shards = parse_shards_json(SHARDS).unwrap();

    let first = initialize_queue(&store, &scope, &shards, &inputs()).await.unwrap();
    assert_eq!(first.created_shards, 2);
    assert_eq!(first.total_requested_shards, 2);
    assert_eq!(first.run_status.counts.total, 2);
    assert_eq!(first.run_status.counts.queued, 2);
    assert_eq!(first.run_status.state, RunState::Running);
    assert!(!first.run_status.terminal);
    assert_eq!(first.run_status.requested_shards, 2);

    // One queued event per created shard.
    let events = store.list(&scope.event_prefix()).await.unwrap();
    let queued_events = events.iter().filter(|k| k.contains("-queued-")).count();
    assert_eq!(queued_events, 2);

    // Progress one shard to succeeded.
    let scribe = EventScribe::new(scope.clone(), "w1");
    let claimed = claim_next(&store, &scope, "w1", &claim_settings(), &scribe, epoch_now())
        .await
        .unwrap()
        .expect("a queued shard must be claimable");
    complete_shard(
        &store,
        &scope,
        &claimed.key,
        claimed.doc,
        0,
        "w1",
        &scribe,
        utc_now(),
    )
    .await
    .unwrap();

    // Second init run: nothing created, progress preserved.
    let second = initialize_queue(&store, &scope, &shards, &inputs()).await.unwrap();
    assert_eq!(second.created_shards, 0);
    assert_eq!(second.run_status.counts.total, 2);
    assert_eq!(second.run_status.counts.succeeded, 1);
    assert_eq!(second.run_status.counts.queued, 1);

    let first_key = scope.shard_key("echidna-0");
    let doc: ShardDoc = get_json(&store, &first_key).await.unwrap().unwrap();
    assert_eq!(doc.status, ShardStatus::Succeeded);
    assert_eq!(doc.attempt, 1);
}
