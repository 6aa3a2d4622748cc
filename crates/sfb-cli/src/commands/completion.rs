//! `sfb completion ...`: read-only completion oracle.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use serde_json::json;
use sfb_completion::{check_run_completion, discover_complete_runs};
use sfb_schemas::keys::RunScope;
use sfb_store::S3Store;

use super::emit;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Output {
    Json,
    Plain,
}

#[derive(Subcommand)]
pub enum CompletionCmd {
    /// Check whether one run is complete
    Check {
        #[arg(long)]
        bucket: String,
        #[arg(long = "run-id")]
        run_id: String,
        #[arg(long = "benchmark-uuid")]
        benchmark_uuid: String,
        #[arg(long = "grace-seconds", default_value_t = 3600)]
        grace_seconds: i64,
        #[arg(long)]
        profile: Option<String>,
        #[arg(long, value_enum, default_value = "json")]
        output: Output,
        #[arg(long = "exit-nonzero-if-incomplete")]
        exit_nonzero_if_incomplete: bool,
    },

    /// List all complete runs in the bucket, newest first
    Discover {
        #[arg(long)]
        bucket: String,
        #[arg(long = "grace-seconds", default_value_t = 3600)]
        grace_seconds: i64,
        #[arg(long)]
        profile: Option<String>,
    },
}

pub async fn run(cmd: CompletionCmd) -> Result<ExitCode> {
    match cmd {
        CompletionCmd::Check {
            bucket,
            run_id,
            benchmark_uuid,
            grace_seconds,
            profile,
            output,
            exit_nonzero_if_incomplete,
        } => {
            let store = S3Store::connect(bucket, profile.as_deref()).await;
            let scope = RunScope::new(run_id, benchmark_uuid);
            let completion = check_run_completion(&store, &scope, grace_seconds, None).await?;
            match output {
                Output::Json => emit(&serde_json::to_value(&completion)?)?,
                Output::Plain => {
                    println!("{}", if completion.complete { "complete" } else { "incomplete" })
                }
            }
            if exit_nonzero_if_incomplete && !completion.complete {
                return Ok(ExitCode::from(1));
            }
            Ok(ExitCode::SUCCESS)
        }

        CompletionCmd::Discover {
            bucket,
            grace_seconds,
            profile,
        } => {
            let store = S3Store::connect(bucket, profile.as_deref()).await;
            let completions = discover_complete_runs(&store, grace_seconds, None).await?;
            let include: Vec<_> = completions
                .iter()
                .map(|c| {
                    let mut entry = json!({
                        "run_id": c.run_id,
                        "benchmark_uuid": c.benchmark_uuid,
                    });
                    if let Some(timeout_hours) = c.timeout_hours {
                        entry["timeout_hours"] = timeout_hours.into();
                    }
                    entry
                })
                .collect();
            emit(&json!({ "include": include }))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
