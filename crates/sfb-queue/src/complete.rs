//! Exit classification and completion transitions.
//!
//! After the runner exits, the shard either succeeds, goes back into
//! `retrying` with capped exponential back-off, or reaches a terminal
//! failure classification with a dead-letter entry. Writing the same
//! terminal state twice is safe; the aggregator is a pure function of the
//! shard statuses.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sfb_schemas::event::EventDetails;
use sfb_schemas::keys::RunScope;
use sfb_schemas::shard::{ShardDoc, ShardStatus};
use sfb_schemas::time::iso_utc;
use sfb_status::dlq::write_dlq_entry;
use sfb_status::events::EventScribe;
use sfb_store::{put_json, ObjectStore};
use tracing::info;

/// Exit code the external runner uses to signal a timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Back-off cap in seconds.
const RETRY_CAP_SECONDS: i64 = 300;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitClass {
    Succeeded,
    TimedOut,
    Failed,
}

impl ExitClass {
    pub fn terminal_status(&self) -> ShardStatus {
        match self {
            ExitClass::Succeeded => ShardStatus::Succeeded,
            ExitClass::TimedOut => ShardStatus::TimedOut,
            ExitClass::Failed => ShardStatus::Failed,
        }
    }
}

/// `0` success, `124` timeout, anything else failure.
pub fn classify_exit(exit_code: i32) -> ExitClass {
    match exit_code {
        0 => ExitClass::Succeeded,
        TIMEOUT_EXIT_CODE => ExitClass::TimedOut,
        _ => ExitClass::Failed,
    }
}

/// `min(300, 30 · 2^(attempt−1))` seconds.
pub fn retry_backoff_seconds(attempt: u32) -> i64 {
    let shift = attempt.saturating_sub(1).min(16);
    (30i64 << shift).min(RETRY_CAP_SECONDS)
}

/// Apply the outcome of one execution to a claimed shard.
///
/// `doc` must be the post-settle confirmed document from the claim. Returns
/// the shard as written.
pub async fn complete_shard(
    store: &dyn ObjectStore,
    scope: &RunScope,
    key: &str,
    mut shard: ShardDoc,
    exit_code: i32,
    worker_id: &str,
    scribe: &EventScribe,
    now: DateTime<Utc>,
) -> Result<ShardDoc> {
    let class = classify_exit(exit_code);
    let attempt = shard.attempt.max(1);
    let max_attempts = shard.max_attempts.max(1);
    let now_iso = iso_utc(now);

    shard.updated_at = now_iso.clone();
    shard.finished_at = Some(now_iso.clone());
    shard.last_worker_id = worker_id.to_string();
    shard.last_exit_code = Some(exit_code);
    shard.claim_token = String::new();

    if class == ExitClass::Succeeded {
        shard.status = ShardStatus::Succeeded;
        shard.retry_available_at_epoch = 0;
        shard.retry_available_at = String::new();
        put_json(store, key, &shard)
            .await
            .with_context(|| format!("write succeeded shard {key}"))?;
        scribe
            .shard_event(
                store,
                &shard.shard_key,
                "succeeded",
                EventDetails {
                    attempt: Some(attempt),
                    exit_code: Some(exit_code),
                    ..Default::default()
                },
            )
            .await?;
        info!(shard_key = %shard.shard_key, attempt, "shard succeeded");
        return Ok(shard);
    }

    if attempt < max_attempts {
        let retry_seconds = retry_backoff_seconds(attempt);
        let retry_at = now + chrono::Duration::seconds(retry_seconds);
        shard.status = ShardStatus::Retrying;
        shard.retry_available_at_epoch = retry_at.timestamp();
        shard.retry_available_at = iso_utc(retry_at);
        put_json(store, key, &shard)
            .await
            .with_context(|| format!("write retrying shard {key}"))?;
        scribe
            .shard_event(
                store,
                &shard.shard_key,
                "retrying",
                EventDetails {
                    attempt: Some(attempt),
                    exit_code: Some(exit_code),
                    retry_in_seconds: Some(retry_seconds),
                    next_retry_at: Some(shard.retry_available_at.clone()),
                    ..Default::default()
                },
            )
            .await?;
        info!(
            shard_key = %shard.shard_key,
            attempt,
            retry_seconds,
            exit_code,
            "shard failed; scheduled for retry"
        );
        return Ok(shard);
    }

    // Attempts exhausted: terminal classification plus a dead-letter entry.
    let terminal = class.terminal_status();
    shard.status = terminal;
    shard.retry_available_at_epoch = 0;
    shard.retry_available_at = String::new();
    put_json(store, key, &shard)
        .await
        .with_context(|| format!("write terminal shard {key}"))?;
    scribe
        .shard_event(
            store,
            &shard.shard_key,
            terminal.as_str(),
            EventDetails {
                attempt: Some(attempt),
                exit_code: Some(exit_code),
                ..Default::default()
            },
        )
        .await?;
    write_dlq_entry(store, scope, &shard, terminal.as_str(), exit_code, worker_id).await?;
    info!(
        shard_key = %shard.shard_key,
        attempt,
        exit_code,
        status = terminal.as_str(),
        "shard terminally failed"
    );
    Ok(shard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_classification() {
        assert_eq!(classify_exit(0), ExitClass::Succeeded);
        assert_eq!(classify_exit(124), ExitClass::TimedOut);
        assert_eq!(classify_exit(1), ExitClass::Failed);
        assert_eq!(classify_exit(2), ExitClass::Failed);
        assert_eq!(classify_exit(127), ExitClass::Failed);
        assert_eq!(classify_exit(-1), ExitClass::Failed);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(retry_backoff_seconds(1), 30);
        assert_eq!(retry_backoff_seconds(2), 60);
        assert_eq!(retry_backoff_seconds(3), 120);
        assert_eq!(retry_backoff_seconds(4), 240);
        assert_eq!(retry_backoff_seconds(5), 300);
        assert_eq!(retry_backoff_seconds(50), 300);
        // attempt 0 is treated like attempt 1
        assert_eq!(retry_backoff_seconds(0), 30);
    }
}
