//! Append-only event documents.
//!
//! Events are advisory: nothing in the coordinator reads them back. The
//! shard objects are authoritative; the event log exists so an observer can
//! reconstruct a timeline after the fact.

use serde::{Deserialize, Serialize};

use crate::run::ShardCounts;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ShardStatus,
    RunStatus,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ShardStatus => "shard_status",
            EventType::RunStatus => "run_status",
        }
    }
}

/// Optional payload carried alongside the core event fields.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_in_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<ShardCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<bool>,
}

impl EventDetails {
    pub fn attempt(attempt: u32) -> Self {
        Self {
            attempt: Some(attempt),
            ..Default::default()
        }
    }

    pub fn reason(reason: &str) -> Self {
        Self {
            reason: Some(reason.to_string()),
            ..Default::default()
        }
    }
}

/// One event object, written once under
/// `status/events/<ts_ms>-<worker>-<shard>-<status>-<rand>.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventDoc {
    pub event_at: String,
    pub event_type: EventType,
    pub run_id: String,
    pub benchmark_uuid: String,
    pub worker_id: String,
    pub shard_key: String,
    pub status: String,
    #[serde(flatten)]
    pub details: EventDetails,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_are_flattened_and_sparse() {
        let ev = EventDoc {
            event_at: "2026-08-01T00:00:00Z".into(),
            event_type: EventType::ShardStatus,
            run_id: "1754000000".into(),
            benchmark_uuid: "0123456789abcdef0123456789abcdef".into(),
            worker_id: "i-0abc".into(),
            shard_key: "echidna-0".into(),
            status: "running".into(),
            details: EventDetails::attempt(2),
        };
        let value = serde_json::to_value(&ev).unwrap();
        assert_eq!(value["event_type"], "shard_status");
        assert_eq!(value["attempt"], 2);
        assert!(value.get("exit_code").is_none());
        assert!(value.get("reason").is_none());
    }
}
