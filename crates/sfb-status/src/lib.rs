//! sfb-status
//!
//! Everything a run publishes about itself: the append-only event log, the
//! aggregated run-status object, advisory worker statuses, and dead-letter
//! entries. The aggregator is a pure function of the shard population; the
//! rest is write-only observability.

pub mod dlq;
pub mod events;
pub mod run;
pub mod workers;

pub use dlq::write_dlq_entry;
pub use events::EventScribe;
pub use run::{refresh_run_status, RunStatusInputs, RunStatusTracker};
pub use workers::WorkerStatusWriter;
