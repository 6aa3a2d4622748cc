//! Run manifest, written once by the launcher and read-only here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_TIMEOUT_HOURS: f64 = 24.0;

/// `manifest.json`. The coordinator only cares about `timeout_hours`;
/// everything else (tool versions, target repo/commit) is carried opaquely.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestDoc {
    /// Accepts a number or a numeric string; see [`ManifestDoc::timeout_hours`].
    #[serde(default)]
    pub timeout_hours: Option<Value>,
    #[serde(default)]
    pub fuzzer_keys: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ManifestDoc {
    /// Effective timeout in hours, defaulting to 24 when the field is
    /// missing or unparseable.
    pub fn timeout_hours(&self) -> f64 {
        match &self.timeout_hours {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(DEFAULT_TIMEOUT_HOURS),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(DEFAULT_TIMEOUT_HOURS),
            _ => DEFAULT_TIMEOUT_HOURS,
        }
    }
}
