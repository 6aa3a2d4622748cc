//! Lock operations: read, acquire, heartbeat, release.
//!
//! Races between simultaneous acquirers resolve through the confirmation
//! read: at most one writer finds its own token preserved after the settle
//! delay; losers back off and retry. When the lock object is absent
//! entirely, a conditional create decides the winner outright.

use std::time::{Duration, Instant};

use rand::Rng;
use sfb_schemas::keys::DEFAULT_LOCK_KEY;
use sfb_schemas::time::{epoch_now, iso_utc, utc_now};
use sfb_store::{get_json, put_json, put_json_if_absent, ObjectStore, StoreError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::document::{LockDoc, LockView};
use crate::error::LockError;

/// Tunables for one lock key.
#[derive(Clone, Debug)]
pub struct LockSettings {
    pub key: String,
    pub lease_seconds: i64,
    /// 0 = wait forever.
    pub acquire_timeout_seconds: i64,
    pub poll_interval: Duration,
    pub settle_delay: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            key: DEFAULT_LOCK_KEY.to_string(),
            lease_seconds: 900,
            acquire_timeout_seconds: 0,
            poll_interval: Duration::from_secs(5),
            settle_delay: Duration::from_millis(600),
        }
    }
}

/// Who is asking, and for which run.
#[derive(Clone, Debug)]
pub struct LockRequest {
    pub owner: String,
    pub run_id: String,
    pub benchmark_uuid: String,
    /// Free-form actor string recorded as `updated_by` (worker id, pid).
    pub actor: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    AlreadyMissing,
}

/// Read the lock and judge its expiry against the clock.
pub async fn read_lock(store: &dyn ObjectStore, key: &str) -> Result<LockView, LockError> {
    let Some(doc) = get_json::<LockDoc>(store, key).await? else {
        return Ok(LockView::absent());
    };
    let expired = doc.expired(epoch_now());
    Ok(LockView {
        exists: true,
        expired,
        doc: Some(doc),
    })
}

fn build_payload(request: &LockRequest, settings: &LockSettings, previous_generation: i64) -> LockDoc {
    let now = utc_now();
    let lease = settings.lease_seconds.max(1);
    let expires = now + chrono::Duration::seconds(lease);
    LockDoc {
        owner: request.owner.clone(),
        run_id: request.run_id.clone(),
        benchmark_uuid: request.benchmark_uuid.clone(),
        lease_seconds: lease,
        generation: previous_generation + 1,
        token: Uuid::new_v4().simple().to_string(),
        updated_by: request.actor.clone(),
        acquired_at: iso_utc(now),
        acquired_at_epoch: now.timestamp(),
        expires_at: iso_utc(expires),
        expires_at_epoch: expires.timestamp(),
    }
}

fn jittered(poll: Duration) -> Duration {
    // Up to +25%, so simultaneous acquirers drift apart.
    let factor = 1.0 + rand::thread_rng().gen_range(0.0..0.25);
    poll.mul_f64(factor)
}

fn timed_out(started: Instant, timeout_seconds: i64) -> bool {
    timeout_seconds > 0 && started.elapsed() >= Duration::from_secs(timeout_seconds as u64)
}

/// Acquire the lock by lease, polling until it is free or the timeout
/// lapses. Returns the confirmed payload on success.
pub async fn acquire(
    store: &dyn ObjectStore,
    settings: &LockSettings,
    request: &LockRequest,
) -> Result<LockDoc, LockError> {
    let started = Instant::now();

    loop {
        let view = read_lock(store, &settings.key).await?;

        if let Some(doc) = &view.doc {
            if !view.expired && doc.owner != request.owner {
                if timed_out(started, settings.acquire_timeout_seconds) {
                    return Err(LockError::TimeoutWaitingForLock {
                        current_owner: doc.owner.clone(),
                    });
                }
                debug!(
                    current_owner = %doc.owner,
                    "lock held by another owner; polling"
                );
                tokio::time::sleep(jittered(settings.poll_interval)).await;
                continue;
            }
        }

        let previous_generation = view.doc.as_ref().map(|doc| doc.generation).unwrap_or(0);
        let payload = build_payload(request, settings, previous_generation);

        if !view.exists {
            // Absent lock: the conditional create picks the single winner,
            // no settle needed.
            match put_json_if_absent(store, &settings.key, &payload).await {
                Ok(()) => {
                    info!(owner = %payload.owner, generation = payload.generation, "lock acquired");
                    return Ok(payload);
                }
                Err(StoreError::PreconditionFailed { .. }) => {
                    debug!("lost conditional create race for lock");
                }
                Err(err) => return Err(err.into()),
            }
        } else {
            // Expired or self-owned lock: overwrite, then confirm our token
            // survived the settle window.
            put_json(store, &settings.key, &payload).await?;
            tokio::time::sleep(settings.settle_delay).await;

            let confirmed = get_json::<LockDoc>(store, &settings.key).await?;
            if let Some(confirmed) = confirmed {
                if confirmed.owner == request.owner && confirmed.token == payload.token {
                    info!(owner = %confirmed.owner, generation = confirmed.generation, "lock acquired");
                    return Ok(confirmed);
                }
            }
            debug!("lock confirmation mismatch; treating as race loss");
        }

        if timed_out(started, settings.acquire_timeout_seconds) {
            return Err(LockError::TimeoutRaceLost);
        }
        tokio::time::sleep(jittered(settings.poll_interval)).await;
    }
}

/// Renew the lease: verify ownership, rewrite with a bumped generation and a
/// fresh token, and confirm the write stuck. A self-owned lock heartbeats
/// successfully even at its expiry instant.
pub async fn heartbeat(
    store: &dyn ObjectStore,
    settings: &LockSettings,
    request: &LockRequest,
) -> Result<LockDoc, LockError> {
    let Some(current) = get_json::<LockDoc>(store, &settings.key).await? else {
        return Err(LockError::Missing);
    };

    if current.owner != request.owner {
        let expired = current.expired(epoch_now());
        if !expired {
            return Err(LockError::OwnerMismatch {
                current_owner: current.owner,
            });
        }
        return Err(LockError::ExpiredOrStolen {
            current_owner: current.owner,
        });
    }

    let payload = build_payload(request, settings, current.generation);
    put_json(store, &settings.key, &payload).await?;

    let Some(confirmed) = get_json::<LockDoc>(store, &settings.key).await? else {
        return Err(LockError::MissingAfterWrite);
    };
    if confirmed.owner != request.owner {
        return Err(LockError::OwnerMismatchAfterWrite {
            current_owner: confirmed.owner,
        });
    }
    Ok(confirmed)
}

/// Delete the lock if we own it or it has expired. Releasing a missing lock
/// is a successful no-op.
pub async fn release(
    store: &dyn ObjectStore,
    settings: &LockSettings,
    owner: &str,
) -> Result<ReleaseOutcome, LockError> {
    let Some(current) = get_json::<LockDoc>(store, &settings.key).await? else {
        return Ok(ReleaseOutcome::AlreadyMissing);
    };

    if current.owner != owner && !current.expired(epoch_now()) {
        return Err(LockError::OwnerMismatch {
            current_owner: current.owner,
        });
    }

    store.delete(&settings.key).await?;
    info!(owner, "lock released");
    Ok(ReleaseOutcome::Released)
}
