//! Lock error taxonomy. Callers branch on these: an acquire timeout exits
//! without touching state, a heartbeat mismatch aborts the worker loop
//! without releasing.

use sfb_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock object is missing")]
    Missing,

    #[error("lock is held by '{current_owner}'")]
    OwnerMismatch { current_owner: String },

    /// The lock expired and someone else (or nobody recognizable) holds the
    /// key now.
    #[error("lock expired or was stolen; current owner '{current_owner}'")]
    ExpiredOrStolen { current_owner: String },

    #[error("lock owner changed to '{current_owner}' after our write")]
    OwnerMismatchAfterWrite { current_owner: String },

    #[error("lock object disappeared after our write")]
    MissingAfterWrite,

    #[error("timed out waiting for lock held by '{current_owner}'")]
    TimeoutWaitingForLock { current_owner: String },

    #[error("timed out losing acquire races")]
    TimeoutRaceLost,

    #[error(transparent)]
    Store(#[from] StoreError),
}
