//! JSON helpers over [`ObjectStore`].
//!
//! Reads are lenient: a payload that fails to deserialize is logged at warn
//! level and treated as absent, so one corrupt object can never wedge a
//! scan. Writes are compact JSON with a trailing newline.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::{ObjectStore, StoreResult};

pub const JSON_CONTENT_TYPE: &str = "application/json";

fn encode<T: Serialize>(doc: &T) -> Vec<u8> {
    let mut body = serde_json::to_vec(doc).expect("JSON document types always serialize");
    body.push(b'\n');
    body
}

/// Fetch and deserialize an object. Absence and malformed payloads both read
/// as `None`; only store-level failures surface as errors.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    key: &str,
) -> StoreResult<Option<T>> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_slice(&raw.bytes) {
        Ok(doc) => Ok(Some(doc)),
        Err(err) => {
            warn!(key, %err, "skipping malformed JSON object");
            Ok(None)
        }
    }
}

pub async fn put_json<T: Serialize>(store: &dyn ObjectStore, key: &str, doc: &T) -> StoreResult<()> {
    store.put(key, encode(doc), JSON_CONTENT_TYPE).await
}

pub async fn put_json_if_absent<T: Serialize>(
    store: &dyn ObjectStore,
    key: &str,
    doc: &T,
) -> StoreResult<()> {
    store.put_if_absent(key, encode(doc), JSON_CONTENT_TYPE).await
}

/// Load every `.json` object under a prefix in key order, skipping objects
/// that vanish mid-scan or fail to parse.
pub async fn list_json<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    prefix: &str,
) -> StoreResult<Vec<(String, T)>> {
    let mut out = Vec::new();
    for key in store.list(prefix).await? {
        if !key.ends_with(".json") {
            continue;
        }
        if let Some(doc) = get_json(store, &key).await? {
            out.push((key, doc));
        }
    }
    Ok(out)
}
