//! `sfb queue init`: idempotent queue initialization.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;
use serde_json::json;
use sfb_queue::{initialize_queue, parse_shards_b64};
use sfb_schemas::keys::RunScope;
use sfb_status::run::RunStatusInputs;
use sfb_store::S3Store;

use super::emit;

#[derive(Subcommand)]
pub enum QueueCmd {
    /// Create missing shard objects and publish the initial run status
    Init {
        #[arg(long)]
        bucket: String,
        #[arg(long = "run-id")]
        run_id: String,
        #[arg(long = "benchmark-uuid")]
        benchmark_uuid: String,
        /// Base64-encoded JSON array of {shard_key, fuzzer_key, run_index}
        #[arg(long = "shards-json-b64")]
        shards_json_b64: String,
        #[arg(long = "max-parallel-instances")]
        max_parallel_instances: u32,
        #[arg(long = "shard-max-attempts", default_value_t = 3)]
        shard_max_attempts: u32,
        #[arg(long = "lock-owner")]
        lock_owner: String,
        #[arg(long)]
        profile: Option<String>,
    },
}

pub async fn run(cmd: QueueCmd) -> Result<ExitCode> {
    match cmd {
        QueueCmd::Init {
            bucket,
            run_id,
            benchmark_uuid,
            shards_json_b64,
            max_parallel_instances,
            shard_max_attempts,
            lock_owner,
            profile,
        } => {
            let shards = parse_shards_b64(&shards_json_b64)?;
            let store = S3Store::connect(bucket, profile.as_deref()).await;
            let scope = RunScope::new(run_id, benchmark_uuid);
            let inputs = RunStatusInputs {
                lock_owner,
                max_parallel_instances,
                shard_max_attempts: shard_max_attempts.max(1),
            };
            let outcome = initialize_queue(&store, &scope, &shards, &inputs).await?;
            emit(&json!({
                "created_shards": outcome.created_shards,
                "total_requested_shards": outcome.total_requested_shards,
                "run_status": outcome.run_status,
            }))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
