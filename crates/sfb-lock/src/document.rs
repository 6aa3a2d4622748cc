//! Lock payload.

use serde::{Deserialize, Serialize};
use sfb_schemas::time::parse_iso_to_epoch;

/// `runs/_control/global-lock.json`. Created on acquire, overwritten by
/// every heartbeat, deleted on release. Considered absent once
/// `now ≥ expires_at_epoch`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LockDoc {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub benchmark_uuid: String,
    #[serde(default)]
    pub lease_seconds: i64,
    /// Bumped on every acquire and heartbeat.
    #[serde(default)]
    pub generation: i64,
    /// Fresh random token per write; how an acquirer recognizes its own
    /// payload on the confirmation read.
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub updated_by: String,
    #[serde(default)]
    pub acquired_at: String,
    #[serde(default, deserialize_with = "sfb_schemas::time::de_epoch_lenient")]
    pub acquired_at_epoch: i64,
    #[serde(default)]
    pub expires_at: String,
    #[serde(default, deserialize_with = "sfb_schemas::time::de_epoch_lenient")]
    pub expires_at_epoch: i64,
}

impl LockDoc {
    /// Expiry judgment, inclusive: a lock whose lease ends exactly now is
    /// already expired. Falls back to the ISO field when the epoch is
    /// unset; a payload with neither is expired.
    pub fn expired(&self, now_epoch: i64) -> bool {
        let expires = if self.expires_at_epoch > 0 {
            Some(self.expires_at_epoch)
        } else {
            parse_iso_to_epoch(&self.expires_at)
        };
        match expires {
            Some(epoch) => now_epoch >= epoch,
            None => true,
        }
    }
}

/// Result of reading the lock object.
#[derive(Clone, Debug)]
pub struct LockView {
    pub exists: bool,
    pub expired: bool,
    pub doc: Option<LockDoc>,
}

impl LockView {
    pub fn absent() -> Self {
        Self {
            exists: false,
            expired: true,
            doc: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_inclusive() {
        let doc = LockDoc {
            expires_at_epoch: 1000,
            ..serde_json::from_str("{}").unwrap()
        };
        assert!(!doc.expired(999));
        assert!(doc.expired(1000));
        assert!(doc.expired(1001));
    }

    #[test]
    fn iso_fallback_when_epoch_missing() {
        let doc: LockDoc =
            serde_json::from_str(r#"{"expires_at": "2026-08-01T00:00:00Z"}"#).unwrap();
        assert!(!doc.expired(0));
        assert!(doc.expired(i64::MAX));
    }

    #[test]
    fn payload_without_expiry_is_expired() {
        let doc: LockDoc = serde_json::from_str(r#"{"owner": "w1"}"#).unwrap();
        assert!(doc.expired(0));
    }

    #[test]
    fn string_epochs_from_older_writers_still_parse() {
        let doc: LockDoc =
            serde_json::from_str(r#"{"owner": "w1", "expires_at_epoch": "2000"}"#).unwrap();
        assert_eq!(doc.expires_at_epoch, 2000);
        assert!(!doc.expired(1999));
        assert!(doc.expired(2000));
    }
}
