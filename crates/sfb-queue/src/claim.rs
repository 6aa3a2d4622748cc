//! Claim protocol.
//!
//! A claim is a tentative overwrite followed by a confirmation read after a
//! short settle delay. Two workers can both write `running` with distinct
//! tokens; at most one re-read finds its own token preserved. The loser
//! treats the shard as taken and keeps scanning. There is no reclamation of
//! `running` shards whose worker died; see the state-machine notes on
//! [`sfb_schemas::ShardStatus`].

use std::time::Duration;

use anyhow::{Context, Result};
use sfb_schemas::event::EventDetails;
use sfb_schemas::keys::RunScope;
use sfb_schemas::shard::{ShardDoc, ShardStatus};
use sfb_schemas::time::iso_utc_now;
use sfb_status::events::EventScribe;
use sfb_store::{get_json, list_json, put_json, ObjectStore};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct ClaimSettings {
    /// Fallback when a shard document lacks `max_attempts`.
    pub default_max_attempts: u32,
    pub settle_delay: Duration,
}

impl Default for ClaimSettings {
    fn default() -> Self {
        Self {
            default_max_attempts: 3,
            settle_delay: Duration::from_millis(600),
        }
    }
}

/// A shard this worker now owns, as confirmed post-settle.
#[derive(Clone, Debug)]
pub struct ClaimedShard {
    pub key: String,
    pub doc: ShardDoc,
}

/// Scan shard objects in key order and claim the first eligible one.
///
/// Returns `Ok(None)` when nothing is claimable this tick: everything is
/// terminal, running elsewhere, or still inside its retry back-off window.
pub async fn claim_next(
    store: &dyn ObjectStore,
    scope: &RunScope,
    worker_id: &str,
    settings: &ClaimSettings,
    scribe: &EventScribe,
    now_epoch: i64,
) -> Result<Option<ClaimedShard>> {
    let shards: Vec<(String, ShardDoc)> = list_json(store, &scope.shard_prefix())
        .await
        .context("list shard objects for claim scan")?;

    for (key, mut shard) in shards {
        if !shard.status.is_claimable() {
            continue;
        }
        if shard.status == ShardStatus::Retrying && now_epoch < shard.retry_available_at_epoch {
            continue;
        }

        // A document missing max_attempts falls back to the configured
        // ceiling; either way the floor is one attempt.
        let max_attempts = if shard.max_attempts == 0 {
            settings.default_max_attempts.max(1)
        } else {
            shard.max_attempts
        };

        // Shards that exhausted retries in a prior generation are closed out
        // here rather than claimed again.
        if shard.attempt >= max_attempts {
            shard.status = ShardStatus::Failed;
            shard.updated_at = iso_utc_now();
            shard.last_worker_id = worker_id.to_string();
            shard.last_exit_code = Some(shard.last_exit_code.unwrap_or(1));
            put_json(store, &key, &shard)
                .await
                .with_context(|| format!("mark exhausted shard failed {key}"))?;
            scribe
                .shard_event(
                    store,
                    &shard.shard_key,
                    "failed",
                    EventDetails::reason("attempts_exhausted"),
                )
                .await?;
            warn!(shard_key = %shard.shard_key, "shard had exhausted attempts; marked failed");
            continue;
        }

        // Tentative claim.
        let claim_token = Uuid::new_v4().simple().to_string();
        let now_iso = iso_utc_now();
        shard.status = ShardStatus::Running;
        shard.attempt += 1;
        shard.claim_token = claim_token.clone();
        shard.updated_at = now_iso.clone();
        shard.started_at = Some(now_iso);
        shard.last_worker_id = worker_id.to_string();
        shard.retry_available_at_epoch = 0;
        shard.retry_available_at = String::new();
        put_json(store, &key, &shard)
            .await
            .with_context(|| format!("write tentative claim {key}"))?;

        tokio::time::sleep(settings.settle_delay).await;

        let Some(confirmed) = get_json::<ShardDoc>(store, &key).await? else {
            debug!(%key, "shard vanished during claim settle; moving on");
            continue;
        };
        if confirmed.claim_token != claim_token || confirmed.status != ShardStatus::Running {
            debug!(
                shard_key = %shard.shard_key,
                "claim lost to another worker post-settle"
            );
            continue;
        }

        scribe
            .shard_event(
                store,
                &confirmed.shard_key,
                "running",
                EventDetails::attempt(confirmed.attempt),
            )
            .await?;
        return Ok(Some(ClaimedShard {
            key,
            doc: confirmed,
        }));
    }

    Ok(None)
}
