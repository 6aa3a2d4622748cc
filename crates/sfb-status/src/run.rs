//! Run-status aggregator.
//!
//! Recomputes `status/run.json` from the current shard population. Safe to
//! re-run at any time: shard statuses are monotonic once terminal, so a
//! terminal run reproduces the same payload (modulo `updated_at`).

use anyhow::{Context, Result};
use sfb_schemas::event::EventDetails;
use sfb_schemas::keys::RunScope;
use sfb_schemas::run::{derive_run_state, RunState, RunStatusDoc, ShardCounts};
use sfb_schemas::shard::ShardDoc;
use sfb_schemas::time::iso_utc_now;
use sfb_store::{get_json, list_json, put_json, ObjectStore};

use crate::events::EventScribe;

/// Run-level settings echoed into every run-status payload.
#[derive(Clone, Debug)]
pub struct RunStatusInputs {
    pub lock_owner: String,
    pub max_parallel_instances: u32,
    pub shard_max_attempts: u32,
}

/// List the shard population, tally it, and rewrite the run-status object,
/// preserving `created_at` and a previously set `completed_at`.
pub async fn refresh_run_status(
    store: &dyn ObjectStore,
    scope: &RunScope,
    inputs: &RunStatusInputs,
) -> Result<RunStatusDoc> {
    let existing: Option<RunStatusDoc> = get_json(store, &scope.run_status_key())
        .await
        .context("read existing run status")?;

    let shards: Vec<(String, ShardDoc)> = list_json(store, &scope.shard_prefix())
        .await
        .context("list shard objects")?;
    let counts = ShardCounts::tally(shards.iter().map(|(_, doc)| doc.status));
    let (state, terminal) = derive_run_state(&counts);

    let now = iso_utc_now();
    let created_at = existing
        .as_ref()
        .map(|doc| doc.created_at.clone())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| now.clone());
    // Once terminal, completed_at sticks to its first value forever.
    let completed_at = match (&existing, terminal) {
        (Some(doc), _) if doc.completed_at.is_some() => doc.completed_at.clone(),
        (_, true) => Some(now.clone()),
        (_, false) => None,
    };

    let payload = RunStatusDoc {
        mode: "s3_queue".to_string(),
        queue_mode: true,
        run_id: scope.run_id.clone(),
        benchmark_uuid: scope.benchmark_uuid.clone(),
        state,
        terminal,
        requested_shards: counts.total,
        counts,
        max_parallel_instances: inputs.max_parallel_instances,
        shard_max_attempts: inputs.shard_max_attempts,
        lock_owner: inputs.lock_owner.clone(),
        created_at,
        updated_at: now,
        completed_at,
    };

    put_json(store, &scope.run_status_key(), &payload)
        .await
        .context("write run status")?;
    Ok(payload)
}

/// Aggregator plus the event edge: emits one `run_status` event whenever the
/// published state differs from the last state this tracker saw.
#[derive(Debug, Default)]
pub struct RunStatusTracker {
    last_state: Option<RunState>,
}

impl RunStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already-published state so the first refresh does not
    /// re-announce it.
    pub fn starting_from(state: RunState) -> Self {
        Self {
            last_state: Some(state),
        }
    }

    pub async fn refresh_and_publish(
        &mut self,
        store: &dyn ObjectStore,
        scope: &RunScope,
        inputs: &RunStatusInputs,
        scribe: &EventScribe,
    ) -> Result<RunStatusDoc> {
        let payload = refresh_run_status(store, scope, inputs).await?;
        if self.last_state != Some(payload.state) {
            let details = EventDetails {
                counts: Some(payload.counts.clone()),
                terminal: Some(payload.terminal),
                ..Default::default()
            };
            scribe
                .run_event(store, payload.state.as_str(), details)
                .await?;
            self.last_state = Some(payload.state);
        }
        Ok(payload)
    }
}
