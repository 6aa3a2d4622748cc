//! sfb-store
//!
//! Thin object-store client: get / put / put-if-absent / delete / list over
//! a trait, plus lenient JSON helpers. Retry policy for transient faults
//! lives *inside* each call; callers never retry application-visible state
//! transitions themselves.

pub mod error;
pub mod json;
pub mod s3;

pub use error::{StoreError, StoreResult};
pub use json::{get_json, list_json, put_json, put_json_if_absent, JSON_CONTENT_TYPE};
pub use s3::S3Store;

use async_trait::async_trait;

/// Raw object payload plus the backend's entity tag, when it has one.
#[derive(Clone, Debug)]
pub struct RawObject {
    pub bytes: Vec<u8>,
    pub etag: Option<String>,
}

/// The only primitive the coordination core assumes: per-object overwrite
/// with one conditional-create escape hatch. No transactions, no CAS.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object. Absence is `Ok(None)`, never an error.
    async fn get(&self, key: &str) -> StoreResult<Option<RawObject>>;

    /// Unconditional overwrite.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> StoreResult<()>;

    /// Create the object only if it does not exist.
    /// Fails with [`StoreError::PreconditionFailed`] when it already does.
    async fn put_if_absent(&self, key: &str, body: Vec<u8>, content_type: &str)
        -> StoreResult<()>;

    /// Delete an object, tolerating absence.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// All keys under `prefix`, fully paginated, sorted ascending.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<String>>;
}
