//! sfb-worker
//!
//! The worker loop: acquire the global lock, initialize the queue, then
//! claim → execute → complete → reconcile until the run is terminal. One
//! main loop and one heartbeat task per process, sharing only signals.

pub mod identity;
pub mod runner;
mod work_loop;

pub use identity::resolve_worker_id;
pub use runner::{FuzzerScriptRunner, ShardRunner};
pub use work_loop::QueueWorker;
