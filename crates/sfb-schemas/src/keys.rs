//! Object-key layout.
//!
//! Everything for one run lives under `runs/<run_id>/<benchmark_uuid>/`;
//! the global lock sits outside any run at a fixed control key. All
//! caller-supplied fragments are sanitized before they touch a key.

use crate::ids::sanitize_fragment;

/// Default location of the global benchmark lock.
pub const DEFAULT_LOCK_KEY: &str = "runs/_control/global-lock.json";

/// Identifies one run and builds every key beneath it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunScope {
    pub run_id: String,
    pub benchmark_uuid: String,
}

impl RunScope {
    pub fn new(run_id: impl Into<String>, benchmark_uuid: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            benchmark_uuid: benchmark_uuid.into(),
        }
    }

    pub fn root_prefix(&self) -> String {
        format!("runs/{}/{}", self.run_id, self.benchmark_uuid)
    }

    pub fn manifest_key(&self) -> String {
        format!("{}/manifest.json", self.root_prefix())
    }

    /// Pre-queue deployments wrote the manifest under `logs/`; the
    /// completion oracle still falls back to it.
    pub fn legacy_manifest_key(&self) -> String {
        format!("logs/{}/{}/manifest.json", self.run_id, self.benchmark_uuid)
    }

    pub fn shard_prefix(&self) -> String {
        format!("{}/queue/shards/", self.root_prefix())
    }

    pub fn shard_key(&self, shard_key: &str) -> String {
        format!("{}{}.json", self.shard_prefix(), sanitize_fragment(shard_key))
    }

    pub fn run_status_key(&self) -> String {
        format!("{}/status/run.json", self.root_prefix())
    }

    pub fn worker_status_key(&self, worker_id: &str) -> String {
        format!(
            "{}/status/workers/{}.json",
            self.root_prefix(),
            sanitize_fragment(worker_id)
        )
    }

    pub fn event_prefix(&self) -> String {
        format!("{}/status/events/", self.root_prefix())
    }

    pub fn event_key(
        &self,
        ts_ms: i64,
        worker_id: &str,
        shard_key: &str,
        status: &str,
        rand_suffix: &str,
    ) -> String {
        format!(
            "{}{}-{}-{}-{}-{}.json",
            self.event_prefix(),
            ts_ms,
            sanitize_fragment(worker_id),
            sanitize_fragment(shard_key),
            sanitize_fragment(status),
            rand_suffix
        )
    }

    pub fn dlq_prefix(&self) -> String {
        format!("{}/dlq/", self.root_prefix())
    }

    pub fn dlq_key(&self, shard_key: &str, attempt: u32) -> String {
        format!(
            "{}{}-{}.json",
            self.dlq_prefix(),
            sanitize_fragment(shard_key),
            attempt
        )
    }
}
