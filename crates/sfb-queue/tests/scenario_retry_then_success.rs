//! Retry with back-off, then success.
//!
//! GREEN when:
//! - A failing first attempt parks the shard in retrying with
//!   retry_available_at_epoch = now + 30.
//! - The shard is unclaimable before that instant and claimable exactly at
//!   it (inclusive gate).
//! - The second attempt's success ends the run as succeeded with an empty
//!   dead-letter queue.

use std::time::Duration;

use sfb_queue::{claim_next, complete_shard, initialize_queue, parse_shards_json, ClaimSettings};
use sfb_schemas::keys::RunScope;
use sfb_schemas::run::RunState;
use sfb_schemas::shard::ShardStatus;
use sfb_schemas::time::{epoch_now, utc_now};
use sfb_status::events::EventScribe;
use sfb_status::run::{refresh_run_status, RunStatusInputs};
use sfb_store::ObjectStore;
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

fn settings() -> ClaimSettings {
    ClaimSettings {
        default_max_attempts: 3,
        settle_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn failed_attempt_backs_off_then_succeeds() {
    let store = MemoryStore::new();
    let scope = scope();
    let scribe = EventScribe::new(scope.clone(), "w1");
    let shards =
        parse_shards_json(r#"[{"shard_key":"shard-x","fuzzer_key":"echidna","run_index":0}]"#)
            .unwrap();
    initialize_queue(&store, &scope, &shards, &inputs()).await.unwrap();

    // Attempt 1 fails with exit 1.
    let claimed = claim_next(&store, &scope, "w1", &settings(), &scribe, epoch_now())
        .await
        .unwrap()
        .expect("fresh shard must be claimable");
    assert_eq!(claimed.doc.attempt, 1);

    let completion_time = utc_now();
    let parked = complete_shard(
        &store,
        &scope,
        &claimed.key,
        claimed.doc,
        1,
        "w1",
        &scribe,
        completion_time,
    )
    .await
    .unwrap();
    assert_eq!(parked.status, ShardStatus::Retrying);
    assert_eq!(
        parked.retry_available_at_epoch,
        completion_time.timestamp() + 30
    );
    assert!(parked.claim_token.is_empty());

    // Inside the back-off window nothing is claimable.
    let early = claim_next(
        &store,
        &scope,
        "w1",
        &settings(),
        &scribe,
        parked.retry_available_at_epoch - 20,
    )
    .await
    .unwrap();
    assert!(early.is_none(), "shard must be unclaimable during back-off");

    // Exactly at the retry instant the shard is claimable again.
    let reclaimed = claim_next(
        &store,
        &scope,
        "w1",
        &settings(),
        &scribe,
        parked.retry_available_at_epoch,
    )
    .await
    .unwrap()
    .expect("shard must be claimable at its retry instant");
    assert_eq!(reclaimed.doc.attempt, 2);
    assert_eq!(reclaimed.doc.retry_available_at_epoch, 0);

    // Attempt 2 succeeds.
    let done = complete_shard(
        &store,
        &scope,
        &reclaimed.key,
        reclaimed.doc,
        0,
        "w1",
        &scribe,
        utc_now(),
    )
    .await
    .unwrap();
    assert_eq!(done.status, ShardStatus::Succeeded);
    assert_eq!(done.attempt, 2);

    let run_status = refresh_run_status(&store, &scope, &inputs()).await.unwrap();
    assert!(run_status.terminal);
    assert_eq!(run_status.state, RunState::Succeeded);
    assert_eq!(run_status.counts.succeeded, 1);

    let dlq = store.list(&scope.dlq_prefix()).await.unwrap();
    assert!(dlq.is_empty(), "a recovered shard must not be dead-lettered");
}
