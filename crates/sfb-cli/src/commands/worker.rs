//! `sfb worker run`: the long-lived queue worker.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use sfb_config::WorkerConfig;
use sfb_store::S3Store;
use sfb_worker::{resolve_worker_id, FuzzerScriptRunner, QueueWorker};
use tracing::{error, info};

#[derive(Subcommand)]
pub enum WorkerCmd {
    /// Acquire the global lock and work the shard queue until the run ends
    Run,
}

pub async fn run(cmd: WorkerCmd) -> Result<ExitCode> {
    match cmd {
        WorkerCmd::Run => {
            let config = WorkerConfig::from_env()?;
            let worker_id = resolve_worker_id().await;
            let hostname = gethostname_or(&worker_id);
            info!(worker_id = %worker_id, run_id = %config.run_id, "queue worker starting");

            let store =
                S3Store::connect(config.bucket.clone(), config.aws_profile.as_deref()).await;
            let runner = FuzzerScriptRunner::new(
                config.fuzzers_dir.clone(),
                config.work_dir.clone(),
                config.log_dir.clone(),
            );

            let worker = QueueWorker::new(
                Arc::new(store),
                Arc::new(runner),
                config,
                worker_id,
                hostname,
            );
            match worker.run().await {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(err) => {
                    error!(%err, "queue worker fatal error");
                    Ok(ExitCode::from(1))
                }
            }
        }
    }
}

fn gethostname_or(fallback: &str) -> String {
    let hostname = gethostname::gethostname().to_string_lossy().trim().to_string();
    if hostname.is_empty() {
        fallback.to_string()
    } else {
        hostname
    }
}
