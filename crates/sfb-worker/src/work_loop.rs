//! The cooperative worker loop.
//!
//! Lifecycle: acquire lock → start heartbeat → initialize queue → loop
//! (claim, execute, complete, reconcile) → release lock only when the run
//! ended terminal. Lock loss aborts without releasing: the lock is no
//! longer ours to delete.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rand::Rng;
use sfb_config::WorkerConfig;
use sfb_lock::{acquire, release, spawn_heartbeat, HeartbeatHandle, LockRequest, LockSettings};
use sfb_queue::{claim_next, complete_shard, initialize_queue, parse_shards_b64, ClaimSettings};
use sfb_schemas::keys::RunScope;
use sfb_schemas::run::RunStatusDoc;
use sfb_schemas::time::{epoch_now, utc_now};
use sfb_schemas::worker::WorkerState;
use sfb_status::events::EventScribe;
use sfb_status::run::{RunStatusInputs, RunStatusTracker};
use sfb_status::workers::WorkerStatusWriter;
use sfb_store::{get_json, ObjectStore};
use tracing::{info, warn};

use crate::runner::ShardRunner;

pub struct QueueWorker {
    store: Arc<dyn ObjectStore>,
    runner: Arc<dyn ShardRunner>,
    config: WorkerConfig,
    scope: RunScope,
    worker_id: String,
    scribe: EventScribe,
    status_writer: WorkerStatusWriter,
    inputs: RunStatusInputs,
    claim_settings: ClaimSettings,
}

impl QueueWorker {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        runner: Arc<dyn ShardRunner>,
        config: WorkerConfig,
        worker_id: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        let worker_id = worker_id.into();
        let scope = config.scope();
        let scribe = EventScribe::new(scope.clone(), worker_id.clone());
        let status_writer = WorkerStatusWriter::new(
            scope.clone(),
            worker_id.clone(),
            hostname,
            config.lock_owner.clone(),
        );
        let inputs = RunStatusInputs {
            lock_owner: config.lock_owner.clone(),
            max_parallel_instances: config.max_parallel_instances,
            shard_max_attempts: config.shard_max_attempts,
        };
        let claim_settings = ClaimSettings {
            default_max_attempts: config.shard_max_attempts,
            ..ClaimSettings::default()
        };
        Self {
            store,
            runner,
            config,
            scope,
            worker_id,
            scribe,
            status_writer,
            inputs,
            claim_settings,
        }
    }

    /// Shorten the claim settle window. Test harnesses zero it; production
    /// keeps the default.
    pub fn set_claim_settle_delay(&mut self, delay: Duration) {
        self.claim_settings.settle_delay = delay;
    }

    fn lock_settings(&self) -> LockSettings {
        LockSettings {
            key: self.config.lock_key.clone(),
            lease_seconds: self.config.lock_lease_seconds,
            acquire_timeout_seconds: self.config.lock_acquire_timeout_seconds,
            ..LockSettings::default()
        }
    }

    fn lock_request(&self) -> LockRequest {
        LockRequest {
            owner: self.config.lock_owner.clone(),
            run_id: self.config.run_id.clone(),
            benchmark_uuid: self.config.benchmark_uuid.clone(),
            actor: self.worker_id.clone(),
        }
    }

    /// Run the whole lifecycle to completion.
    pub async fn run(&self) -> Result<()> {
        let settings = self.lock_settings();
        let request = self.lock_request();

        acquire(self.store.as_ref(), &settings, &request)
            .await
            .context("failed to acquire global lock")?;
        info!(owner = %request.owner, "global lock acquired");

        let heartbeat = spawn_heartbeat(
            Arc::clone(&self.store),
            settings.clone(),
            request.clone(),
            Duration::from_secs(self.config.lock_heartbeat_seconds as u64),
        );

        let result = self.drive(&heartbeat).await;
        heartbeat.shutdown().await;
        result
    }

    async fn drive(&self, heartbeat: &HeartbeatHandle) -> Result<()> {
        let store = self.store.as_ref();
        let shards = parse_shards_b64(&self.config.shards_json_b64)
            .context("invalid shard list in environment")?;

        let init = initialize_queue(store, &self.scope, &shards, &self.inputs)
            .await
            .context("queue initialization failed")?;
        let mut tracker = RunStatusTracker::starting_from(init.run_status.state);
        self.write_worker_status(WorkerState::Idle, "", 0, None)
            .await?;

        let claim_settings = self.claim_settings.clone();

        let mut idle_polls = 0u32;
        loop {
            if heartbeat.lock_lost() {
                bail!("lock heartbeat failed; stopping worker without release");
            }

            let claimed = claim_next(
                store,
                &self.scope,
                &self.worker_id,
                &claim_settings,
                &self.scribe,
                epoch_now(),
            )
            .await?;

            let Some(claimed) = claimed else {
                let run_status = tracker
                    .refresh_and_publish(store, &self.scope, &self.inputs, &self.scribe)
                    .await?;
                if run_status.terminal {
                    info!(state = run_status.state.as_str(), "run reached terminal state");
                    break;
                }

                idle_polls += 1;
                self.write_worker_status(WorkerState::Idle, "", 0, None)
                    .await?;
                if idle_polls >= self.config.idle_polls_before_exit {
                    info!(idle_polls, "queue idle; continuing to poll");
                    idle_polls = 0;
                }
                tokio::time::sleep(self.idle_sleep()).await;
                continue;
            };

            idle_polls = 0;
            let shard = claimed.doc.clone();
            self.write_worker_status(WorkerState::Running, &shard.shard_key, shard.attempt, None)
                .await?;

            let exit_code = self.runner.run(&shard).await?;
            self.write_worker_status(
                WorkerState::Idle,
                &shard.shard_key,
                shard.attempt,
                Some(exit_code),
            )
            .await?;

            complete_shard(
                store,
                &self.scope,
                &claimed.key,
                shard,
                exit_code,
                &self.worker_id,
                &self.scribe,
                utc_now(),
            )
            .await?;

            let run_status = tracker
                .refresh_and_publish(store, &self.scope, &self.inputs, &self.scribe)
                .await?;
            if run_status.terminal {
                info!(state = run_status.state.as_str(), "run reached terminal state");
                break;
            }
        }

        let final_status: Option<RunStatusDoc> =
            get_json(store, &self.scope.run_status_key()).await?;
        self.write_worker_status(WorkerState::Stopped, "", 0, None)
            .await?;

        if final_status.map(|doc| doc.terminal).unwrap_or(false) {
            match release(store, &self.lock_settings(), &self.config.lock_owner).await {
                Ok(outcome) => info!(?outcome, "global lock released"),
                Err(err) => warn!(%err, "lock release skipped/failed"),
            }
        }
        Ok(())
    }

    async fn write_worker_status(
        &self,
        state: WorkerState,
        current_shard: &str,
        attempt: u32,
        last_exit_code: Option<i32>,
    ) -> Result<()> {
        self.status_writer
            .write(
                self.store.as_ref(),
                state,
                current_shard,
                attempt,
                last_exit_code,
            )
            .await
    }

    fn idle_sleep(&self) -> Duration {
        let jitter = rand::thread_rng().gen_range(0..=3);
        Duration::from_secs((self.config.poll_seconds + jitter) as u64)
    }
}
