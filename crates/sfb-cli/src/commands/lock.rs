//! `sfb lock ...`: read, acquire, heartbeat, release.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;
use sfb_lock::{acquire, heartbeat, read_lock, release, LockError, LockRequest, LockSettings};
use sfb_schemas::keys::DEFAULT_LOCK_KEY;
use sfb_store::S3Store;

use super::emit;

#[derive(Args, Clone)]
pub struct StoreArgs {
    #[arg(long)]
    pub bucket: String,
    #[arg(long, default_value = DEFAULT_LOCK_KEY)]
    pub key: String,
    #[arg(long)]
    pub profile: Option<String>,
}

#[derive(Args, Clone)]
pub struct OwnerArgs {
    #[arg(long)]
    pub owner: String,
    #[arg(long = "run-id")]
    pub run_id: String,
    #[arg(long = "benchmark-uuid")]
    pub benchmark_uuid: String,
    #[arg(long = "lease-seconds", default_value_t = 900)]
    pub lease_seconds: i64,
    /// Free-form actor recorded as updated_by; defaults to pid-<pid>.
    #[arg(long, default_value = "")]
    pub actor: String,
}

impl OwnerArgs {
    fn request(&self) -> LockRequest {
        let actor = if self.actor.is_empty() {
            format!("pid-{}", std::process::id())
        } else {
            self.actor.clone()
        };
        LockRequest {
            owner: self.owner.clone(),
            run_id: self.run_id.clone(),
            benchmark_uuid: self.benchmark_uuid.clone(),
            actor,
        }
    }
}

#[derive(Subcommand)]
pub enum LockCmd {
    /// Read the lock and report expiry
    Read {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Acquire the lock by lease, polling until free or timed out
    Acquire {
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        owner: OwnerArgs,
        #[arg(long = "acquire-timeout-seconds", default_value_t = 0)]
        acquire_timeout_seconds: i64,
        #[arg(long = "poll-seconds", default_value_t = 5.0)]
        poll_seconds: f64,
    },

    /// Renew the lease of a held lock
    Heartbeat {
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        owner: OwnerArgs,
    },

    /// Release the lock (idempotent)
    Release {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long)]
        owner: String,
    },
}

pub async fn run(cmd: LockCmd) -> Result<ExitCode> {
    match cmd {
        LockCmd::Read { store } => {
            let s3 = connect(&store).await;
            let view = read_lock(&s3, &store.key).await?;
            if !view.exists {
                emit(&json!({"exists": false}))?;
            } else {
                emit(&json!({
                    "exists": true,
                    "expired": view.expired,
                    "lock": view.doc,
                }))?;
            }
            Ok(ExitCode::SUCCESS)
        }

        LockCmd::Acquire {
            store,
            owner,
            acquire_timeout_seconds,
            poll_seconds,
        } => {
            let s3 = connect(&store).await;
            let settings = LockSettings {
                key: store.key.clone(),
                lease_seconds: owner.lease_seconds,
                acquire_timeout_seconds,
                poll_interval: Duration::from_secs_f64(poll_seconds.max(0.25)),
                ..LockSettings::default()
            };
            match acquire(&s3, &settings, &owner.request()).await {
                Ok(doc) => {
                    emit(&json!({"acquired": true, "lock": doc}))?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(LockError::TimeoutWaitingForLock { current_owner }) => {
                    emit(&json!({
                        "acquired": false,
                        "reason": "timeout_waiting_for_lock",
                        "current_owner": current_owner,
                    }))?;
                    Ok(ExitCode::from(1))
                }
                Err(LockError::TimeoutRaceLost) => {
                    emit(&json!({"acquired": false, "reason": "timeout_race_lost"}))?;
                    Ok(ExitCode::from(1))
                }
                Err(err) => Err(err.into()),
            }
        }

        LockCmd::Heartbeat { store, owner } => {
            let s3 = connect(&store).await;
            match heartbeat(&s3, &settings_for(&store, owner.lease_seconds), &owner.request()).await
            {
                Ok(doc) => {
                    emit(&json!({"ok": true, "lock": doc}))?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    let (reason, current_owner) = heartbeat_reason(&err);
                    let mut body = json!({"ok": false, "reason": reason});
                    if let Some(current_owner) = current_owner {
                        body["current_owner"] = current_owner.into();
                    }
                    emit(&body)?;
                    Ok(ExitCode::from(2))
                }
            }
        }

        LockCmd::Release { store, owner } => {
            let s3 = connect(&store).await;
            match release(&s3, &settings_for(&store, 900), &owner).await {
                Ok(sfb_lock::ReleaseOutcome::Released) => {
                    emit(&json!({"released": true}))?;
                    Ok(ExitCode::SUCCESS)
                }
                Ok(sfb_lock::ReleaseOutcome::AlreadyMissing) => {
                    emit(&json!({"released": false, "reason": "missing"}))?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(LockError::OwnerMismatch { current_owner }) => {
                    emit(&json!({
                        "released": false,
                        "reason": "owner_mismatch",
                        "current_owner": current_owner,
                    }))?;
                    Ok(ExitCode::from(1))
                }
                Err(err) => Err(err.into()),
            }
        }
    }
}

async fn connect(store: &StoreArgs) -> S3Store {
    S3Store::connect(store.bucket.clone(), store.profile.as_deref()).await
}

fn settings_for(store: &StoreArgs, lease_seconds: i64) -> LockSettings {
    LockSettings {
        key: store.key.clone(),
        lease_seconds,
        ..LockSettings::default()
    }
}

fn heartbeat_reason(err: &LockError) -> (&'static str, Option<String>) {
    match err {
        LockError::Missing => ("missing", None),
        LockError::OwnerMismatch { current_owner } => {
            ("owner_mismatch", Some(current_owner.clone()))
        }
        LockError::ExpiredOrStolen { current_owner } => {
            ("expired_or_stolen", Some(current_owner.clone()))
        }
        LockError::MissingAfterWrite => ("missing_after_write", None),
        LockError::OwnerMismatchAfterWrite { current_owner } => {
            ("owner_mismatch_after_write", Some(current_owner.clone()))
        }
        _ => ("store_error", None),
    }
}
