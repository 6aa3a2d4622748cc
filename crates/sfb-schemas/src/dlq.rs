//! Dead-letter documents for permanently failed shard attempts.

use serde::{Deserialize, Serialize};

/// `dlq/<sanitized_shard>-<attempt>.json`, written once when a shard
/// exhausts its attempts with a non-success exit. No coordinator code reads
/// these back; they exist for diagnosis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DlqDoc {
    pub run_id: String,
    pub benchmark_uuid: String,
    pub shard_key: String,
    pub fuzzer_key: String,
    /// Terminal classification: `failed` or `timed_out`.
    pub status: String,
    pub attempt: u32,
    pub max_attempts: u32,
    pub exit_code: i32,
    pub worker_id: String,
    pub failed_at: String,
}
