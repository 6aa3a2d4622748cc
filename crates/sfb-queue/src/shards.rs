//! Shard-list parsing and validation.
//!
//! The launcher hands workers the shard list as base64-encoded JSON. Every
//! entry is validated against the identifier rules before anything touches
//! the store, duplicates are rejected, and an empty list is an error.

use std::collections::BTreeSet;

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use sfb_schemas::ids::validate_key_fragment;

/// One requested unit of work: `(shard_key, fuzzer_key, run_index)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSpec {
    pub shard_key: String,
    pub fuzzer_key: String,
    pub run_index: u32,
}

/// Decode and validate a base64 shard-list envelope.
pub fn parse_shards_b64(encoded: &str) -> Result<Vec<ShardSpec>> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .context("shard list is not valid base64")?;
    let text = String::from_utf8(raw).context("shard list is not valid UTF-8")?;
    parse_shards_json(&text)
}

/// Validate a JSON shard list: non-empty, well-formed keys, no duplicates.
pub fn parse_shards_json(text: &str) -> Result<Vec<ShardSpec>> {
    let entries: Vec<ShardSpec> =
        serde_json::from_str(text).context("shard list is not a JSON array of shard objects")?;
    if entries.is_empty() {
        return Err(anyhow!("shard list is empty"));
    }

    let mut seen = BTreeSet::new();
    for spec in &entries {
        validate_key_fragment("shard_key", &spec.shard_key)?;
        validate_key_fragment("fuzzer_key", &spec.fuzzer_key)?;
        if !seen.insert(spec.shard_key.clone()) {
            return Err(anyhow!("duplicate shard_key: {}", spec.shard_key));
        }
    }
    Ok(entries)
}
