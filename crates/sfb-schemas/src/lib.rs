//! sfb-schemas
//!
//! Shared vocabulary of the coordination core:
//! - identifier validation + key-fragment sanitization
//! - every JSON document that lives in the object store
//! - shard/run status enums and the count derivation
//! - the object-key layout under `runs/<run_id>/<benchmark_uuid>/`
//!
//! Nothing in this crate talks to the store; it only defines what the
//! objects look like and where they live.

pub mod dlq;
pub mod event;
pub mod ids;
pub mod keys;
pub mod manifest;
pub mod run;
pub mod shard;
pub mod time;
pub mod worker;

pub use dlq::DlqDoc;
pub use event::{EventDetails, EventDoc, EventType};
pub use ids::{sanitize_fragment, validate_benchmark_uuid, validate_key_fragment};
pub use keys::RunScope;
pub use manifest::ManifestDoc;
pub use run::{derive_run_state, RunState, RunStatusDoc, ShardCounts};
pub use shard::{ShardDoc, ShardStatus};
pub use worker::{WorkerState, WorkerStatusDoc};
