//! sfb-queue
//!
//! The shard queue: one JSON object per shard under `queue/shards/`,
//! distributed by a claim-and-confirm protocol and driven to terminal
//! states with bounded retries. Only the global lock holder runs these
//! operations for a given run.

pub mod claim;
pub mod complete;
pub mod init;
pub mod shards;

pub use claim::{claim_next, ClaimSettings, ClaimedShard};
pub use complete::{classify_exit, complete_shard, retry_backoff_seconds, ExitClass};
pub use init::{initialize_queue, InitOutcome};
pub use shards::{parse_shards_b64, parse_shards_json, ShardSpec};
