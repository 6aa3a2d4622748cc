//! Shard state documents.
//!
//! One JSON object per shard under `queue/shards/<shard_key>.json`. The
//! status string is the authoritative lifecycle state; anything we do not
//! recognize deserializes as `Unknown` so a scan never stalls on a bad
//! payload.

use serde::{Deserialize, Serialize};

/// Shard lifecycle.
///
/// `queued → running → {succeeded | retrying | failed | timed_out}` and
/// `retrying → running`. There is no transition out of a terminal state and
/// no `running → queued`: a worker that dies mid-shard leaves the shard
/// `running` until an operator re-enqueues it by hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardStatus {
    Queued,
    Running,
    Retrying,
    Succeeded,
    Failed,
    TimedOut,
    #[serde(other)]
    Unknown,
}

impl ShardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShardStatus::Queued => "queued",
            ShardStatus::Running => "running",
            ShardStatus::Retrying => "retrying",
            ShardStatus::Succeeded => "succeeded",
            ShardStatus::Failed => "failed",
            ShardStatus::TimedOut => "timed_out",
            ShardStatus::Unknown => "unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ShardStatus::Succeeded | ShardStatus::Failed | ShardStatus::TimedOut
        )
    }

    /// True for statuses a claim scan may pick up (subject to the retry
    /// back-off gate for `retrying`).
    pub fn is_claimable(&self) -> bool {
        matches!(self, ShardStatus::Queued | ShardStatus::Retrying)
    }
}

impl Default for ShardStatus {
    fn default() -> Self {
        ShardStatus::Unknown
    }
}

/// One shard's full state. Fields default on deserialize so a partially
/// written or older payload still reads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShardDoc {
    #[serde(default)]
    pub shard_key: String,
    #[serde(default)]
    pub fuzzer_key: String,
    #[serde(default)]
    pub run_index: u32,
    #[serde(default)]
    pub status: ShardStatus,
    #[serde(default)]
    pub attempt: u32,
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub last_worker_id: String,
    #[serde(default)]
    pub last_exit_code: Option<i32>,
    /// Epoch seconds before which a `retrying` shard must not be claimed.
    /// Zero when not in back-off.
    #[serde(default, deserialize_with = "crate::time::de_epoch_lenient")]
    pub retry_available_at_epoch: i64,
    #[serde(default)]
    pub retry_available_at: String,
    /// Fresh random token written by the claiming worker; cleared on every
    /// retry or terminal transition.
    #[serde(default)]
    pub claim_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

impl ShardDoc {
    /// A brand-new `queued` shard as the initializer writes it.
    pub fn queued(
        shard_key: &str,
        fuzzer_key: &str,
        run_index: u32,
        max_attempts: u32,
        now_iso: &str,
    ) -> Self {
        Self {
            shard_key: shard_key.to_string(),
            fuzzer_key: fuzzer_key.to_string(),
            run_index,
            status: ShardStatus::Queued,
            attempt: 0,
            max_attempts,
            created_at: now_iso.to_string(),
            updated_at: now_iso.to_string(),
            last_worker_id: String::new(),
            last_exit_code: None,
            retry_available_at_epoch: 0,
            retry_available_at: String::new(),
            claim_token: String::new(),
            started_at: None,
            finished_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_json() {
        for status in [
            ShardStatus::Queued,
            ShardStatus::Running,
            ShardStatus::Retrying,
            ShardStatus::Succeeded,
            ShardStatus::Failed,
            ShardStatus::TimedOut,
        ] {
            let s = serde_json::to_string(&status).unwrap();
            let back: ShardStatus = serde_json::from_str(&s).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn unrecognized_status_reads_as_unknown() {
        let back: ShardStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(back, ShardStatus::Unknown);
    }

    #[test]
    fn partial_payload_still_parses() {
        let doc: ShardDoc =
            serde_json::from_str(r#"{"shard_key":"a","status":"queued"}"#).unwrap();
        assert_eq!(doc.shard_key, "a");
        assert_eq!(doc.status, ShardStatus::Queued);
        assert_eq!(doc.attempt, 0);
        assert!(doc.started_at.is_none());
    }

    #[test]
    fn terminal_and_claimable_are_disjoint() {
        for status in [
            ShardStatus::Queued,
            ShardStatus::Running,
            ShardStatus::Retrying,
            ShardStatus::Succeeded,
            ShardStatus::Failed,
            ShardStatus::TimedOut,
            ShardStatus::Unknown,
        ] {
            assert!(!(status.is_terminal() && status.is_claimable()));
        }
    }
}
