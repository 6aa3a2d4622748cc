//! Advisory worker-status publisher.

use anyhow::{Context, Result};
use sfb_schemas::keys::RunScope;
use sfb_schemas::time::iso_utc_now;
use sfb_schemas::worker::{WorkerState, WorkerStatusDoc};
use sfb_store::{put_json, ObjectStore};

/// Rewrites `status/workers/<worker>.json` after each worker state change.
#[derive(Clone, Debug)]
pub struct WorkerStatusWriter {
    scope: RunScope,
    worker_id: String,
    hostname: String,
    lock_owner: String,
}

impl WorkerStatusWriter {
    pub fn new(
        scope: RunScope,
        worker_id: impl Into<String>,
        hostname: impl Into<String>,
        lock_owner: impl Into<String>,
    ) -> Self {
        Self {
            scope,
            worker_id: worker_id.into(),
            hostname: hostname.into(),
            lock_owner: lock_owner.into(),
        }
    }

    pub async fn write(
        &self,
        store: &dyn ObjectStore,
        state: WorkerState,
        current_shard: &str,
        attempt: u32,
        last_exit_code: Option<i32>,
    ) -> Result<()> {
        let doc = WorkerStatusDoc {
            run_id: self.scope.run_id.clone(),
            benchmark_uuid: self.scope.benchmark_uuid.clone(),
            worker_id: self.worker_id.clone(),
            hostname: self.hostname.clone(),
            lock_owner: self.lock_owner.clone(),
            state,
            current_shard: current_shard.to_string(),
            attempt,
            last_exit_code,
            updated_at: iso_utc_now(),
        };
        let key = self.scope.worker_status_key(&self.worker_id);
        put_json(store, &key, &doc)
            .await
            .with_context(|| format!("write worker status {key}"))
    }
}
