//! Event-log writer.
//!
//! Each event is an independent write-once object whose key encodes
//! ordering (millisecond timestamp prefix) and uniqueness (random suffix).
//! Writers never check for existence and nothing in the coordinator reads
//! events back.

use anyhow::{Context, Result};
use sfb_schemas::event::{EventDetails, EventDoc, EventType};
use sfb_schemas::keys::RunScope;
use sfb_schemas::time::{epoch_ms_now, iso_utc_now};
use sfb_store::{put_json, ObjectStore};
use uuid::Uuid;

/// Identity under which this process writes events.
#[derive(Clone, Debug)]
pub struct EventScribe {
    scope: RunScope,
    worker_id: String,
}

impl EventScribe {
    pub fn new(scope: RunScope, worker_id: impl Into<String>) -> Self {
        Self {
            scope,
            worker_id: worker_id.into(),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Emit a `shard_status` event for one shard transition.
    pub async fn shard_event(
        &self,
        store: &dyn ObjectStore,
        shard_key: &str,
        status: &str,
        details: EventDetails,
    ) -> Result<()> {
        self.emit(store, EventType::ShardStatus, shard_key, status, details)
            .await
    }

    /// Emit a `run_status` event. The shard slot carries the literal `run`.
    pub async fn run_event(
        &self,
        store: &dyn ObjectStore,
        state: &str,
        details: EventDetails,
    ) -> Result<()> {
        self.emit(store, EventType::RunStatus, "run", state, details)
            .await
    }

    async fn emit(
        &self,
        store: &dyn ObjectStore,
        event_type: EventType,
        shard_key: &str,
        status: &str,
        details: EventDetails,
    ) -> Result<()> {
        let doc = EventDoc {
            event_at: iso_utc_now(),
            event_type,
            run_id: self.scope.run_id.clone(),
            benchmark_uuid: self.scope.benchmark_uuid.clone(),
            worker_id: self.worker_id.clone(),
            shard_key: shard_key.to_string(),
            status: status.to_string(),
            details,
        };
        let token = Uuid::new_v4().simple().to_string();
        let key = self.scope.event_key(
            epoch_ms_now(),
            &self.worker_id,
            shard_key,
            status,
            &token[..8],
        );
        put_json(store, &key, &doc)
            .await
            .with_context(|| format!("emit event {key}"))
    }
}
