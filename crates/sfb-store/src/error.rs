//! Store error taxonomy.
//!
//! Callers branch on these kinds (absent lock = acquirable, transient claim
//! failure = poll again), so this is one of the two places in the workspace
//! that uses typed errors instead of `anyhow`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist. Never fatal; interpreted semantically by
    /// the caller. Most read paths see absence as `Ok(None)` instead.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// Network faults, throttling, 5xx. Already retried with bounded
    /// exponential back-off inside the client call before surfacing.
    #[error("transient store failure on {operation} {key} after {attempts} attempts: {message}")]
    Transient {
        operation: &'static str,
        key: String,
        attempts: u32,
        message: String,
    },

    /// A conditional create lost: the object already exists.
    #[error("precondition failed: {key} already exists")]
    PreconditionFailed { key: String },

    /// Anything else: auth failures, invalid bucket, client bugs.
    #[error("store failure on {operation} {key}: {message}")]
    Fatal {
        operation: &'static str,
        key: String,
        message: String,
    },
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
