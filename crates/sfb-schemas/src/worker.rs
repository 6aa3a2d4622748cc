//! Advisory per-worker status documents.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    Running,
    Stopped,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Running => "running",
            WorkerState::Stopped => "stopped",
        }
    }
}

/// `status/workers/<worker>.json`, rewritten after every worker state
/// change. Purely informational; no coordination decision reads it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerStatusDoc {
    pub run_id: String,
    pub benchmark_uuid: String,
    pub worker_id: String,
    pub hostname: String,
    pub lock_owner: String,
    pub state: WorkerState,
    #[serde(default)]
    pub current_shard: String,
    #[serde(default)]
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_exit_code: Option<i32>,
    pub updated_at: String,
}
