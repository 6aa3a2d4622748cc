//! Identifier validation and key-fragment sanitization.
//!
//! Every identifier that ends up inside an object key is either validated
//! against a closed alphabet or sanitized by replacement, so no input can
//! introduce path traversal or prefix collisions.

use anyhow::{anyhow, Result};

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
///
/// Applied to worker ids, shard keys, and statuses before they are embedded
/// in object keys. Payload fields keep the raw value.
pub fn sanitize_fragment(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Validate a shard or fuzzer key: `[a-z0-9][a-z0-9-]{0,63}`.
pub fn validate_key_fragment(kind: &str, value: &str) -> Result<()> {
    let mut chars = value.chars();
    let first = chars
        .next()
        .ok_or_else(|| anyhow!("{kind} must not be empty"))?;
    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return Err(anyhow!(
            "{kind} '{value}' must start with a lowercase letter or digit"
        ));
    }
    if value.len() > 64 {
        return Err(anyhow!("{kind} '{value}' exceeds 64 characters"));
    }
    for c in chars {
        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            return Err(anyhow!(
                "{kind} '{value}' contains invalid character '{c}' (allowed: [a-z0-9-])"
            ));
        }
    }
    Ok(())
}

/// Validate a benchmark uuid: exactly 32 lowercase hex characters.
pub fn validate_benchmark_uuid(value: &str) -> Result<()> {
    if value.len() != 32 {
        return Err(anyhow!(
            "benchmark_uuid must be 32 lowercase hex characters (got {} chars)",
            value.len()
        ));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    {
        return Err(anyhow!("benchmark_uuid '{value}' is not lowercase hex"));
    }
    Ok(())
}
