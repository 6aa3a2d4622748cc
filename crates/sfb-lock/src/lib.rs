//! sfb-lock
//!
//! The global benchmark lock: a single JSON object that serializes whole
//! runs across every worker in the deployment. Built on overwrite-only
//! storage plus one conditional create, so mutual exclusion rests on a
//! random token, an absolute lease expiry, and a read-after-write
//! confirmation with a short settle delay.

mod document;
mod error;
mod heartbeat;
mod ops;

pub use document::{LockDoc, LockView};
pub use error::LockError;
pub use heartbeat::{spawn_heartbeat, HeartbeatHandle};
pub use ops::{acquire, heartbeat, read_lock, release, LockRequest, LockSettings, ReleaseOutcome};
