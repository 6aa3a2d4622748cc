//! Queue initializer.
//!
//! Creates one `queued` shard object per requested shard, skipping any that
//! already exist so re-running is safe: statuses and attempt counts of
//! tracked shards are never disturbed. Finishes by refreshing the run
//! status so `counts.total` reflects the full population.

use anyhow::{Context, Result};
use sfb_schemas::event::EventDetails;
use sfb_schemas::keys::RunScope;
use sfb_schemas::run::RunStatusDoc;
use sfb_schemas::shard::ShardDoc;
use sfb_schemas::time::iso_utc_now;
use sfb_status::events::EventScribe;
use sfb_status::run::{refresh_run_status, RunStatusInputs};
use sfb_store::{get_json, put_json, ObjectStore};
use tracing::info;

use crate::shards::ShardSpec;

/// Identity recorded on initializer-written events.
pub const BOOTSTRAP_WORKER_ID: &str = "bootstrap";

#[derive(Clone, Debug)]
pub struct InitOutcome {
    pub created_shards: u32,
    pub total_requested_shards: u32,
    pub run_status: RunStatusDoc,
}

/// Create missing shard objects and publish the initial run status.
///
/// `shards` must already be validated (see [`crate::parse_shards_b64`]).
pub async fn initialize_queue(
    store: &dyn ObjectStore,
    scope: &RunScope,
    shards: &[ShardSpec],
    inputs: &RunStatusInputs,
) -> Result<InitOutcome> {
    let scribe = EventScribe::new(scope.clone(), BOOTSTRAP_WORKER_ID);
    let now = iso_utc_now();
    let mut created = 0u32;

    for spec in shards {
        let key = scope.shard_key(&spec.shard_key);
        let existing: Option<ShardDoc> = get_json(store, &key)
            .await
            .with_context(|| format!("probe shard object {key}"))?;
        if existing.is_some() {
            continue;
        }

        let doc = ShardDoc::queued(
            &spec.shard_key,
            &spec.fuzzer_key,
            spec.run_index,
            inputs.shard_max_attempts.max(1),
            &now,
        );
        put_json(store, &key, &doc)
            .await
            .with_context(|| format!("create shard object {key}"))?;
        scribe
            .shard_event(store, &spec.shard_key, "queued", EventDetails::attempt(0))
            .await?;
        created += 1;
    }

    let run_status = refresh_run_status(store, scope, inputs)
        .await
        .context("refresh run status after init")?;
    let details = EventDetails {
        reason: Some("initialized".to_string()),
        counts: Some(run_status.counts.clone()),
        terminal: Some(run_status.terminal),
        ..Default::default()
    };
    scribe
        .run_event(store, run_status.state.as_str(), details)
        .await?;

    info!(
        created,
        requested = shards.len(),
        "queue initialization complete"
    );
    Ok(InitOutcome {
        created_shards: created,
        total_requested_shards: shards.len() as u32,
        run_status,
    })
}
