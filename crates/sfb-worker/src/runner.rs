//! Runner interface.
//!
//! Each fuzzer ships a `run.sh` under `<fuzzers_dir>/<fuzzer_key>/`. The
//! worker gives it a fresh work dir and log dir per attempt and reads back
//! nothing but the exit code: 0 success, 124 timeout, anything else
//! failure. The runner must never touch coordination state.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sfb_schemas::ids::sanitize_fragment;
use sfb_schemas::shard::ShardDoc;
use tracing::{info, warn};

/// Sentinel exit when the fuzzer's run script is missing.
pub const MISSING_RUNNER_EXIT_CODE: i32 = 127;
/// Sentinel exit when the shard document lacks its identifying keys.
pub const INVALID_SHARD_EXIT_CODE: i32 = 2;

#[async_trait]
pub trait ShardRunner: Send + Sync {
    /// Execute one attempt and return its exit code. Errors are reserved
    /// for the worker's own environment failing (e.g. unusable work dir);
    /// fuzzer failures are exit codes.
    async fn run(&self, shard: &ShardDoc) -> Result<i32>;
}

pub struct FuzzerScriptRunner {
    fuzzers_dir: PathBuf,
    work_root: PathBuf,
    log_root: PathBuf,
}

impl FuzzerScriptRunner {
    pub fn new(fuzzers_dir: PathBuf, work_root: PathBuf, log_root: PathBuf) -> Self {
        Self {
            fuzzers_dir,
            work_root,
            log_root,
        }
    }
}

#[async_trait]
impl ShardRunner for FuzzerScriptRunner {
    async fn run(&self, shard: &ShardDoc) -> Result<i32> {
        let shard_key = shard.shard_key.trim();
        let fuzzer_key = shard.fuzzer_key.trim();
        let attempt = shard.attempt.max(1);
        if shard_key.is_empty() || fuzzer_key.is_empty() {
            warn!("shard document missing shard_key/fuzzer_key; refusing to run");
            return Ok(INVALID_SHARD_EXIT_CODE);
        }

        let script = self
            .fuzzers_dir
            .join(sanitize_fragment(fuzzer_key))
            .join("run.sh");
        if !script.is_file() {
            warn!(fuzzer_key, script = %script.display(), "missing run script");
            return Ok(MISSING_RUNNER_EXIT_CODE);
        }

        let safe_shard = sanitize_fragment(shard_key);
        let attempt_dir = format!("attempt-{attempt}");
        let workdir = self.work_root.join(&safe_shard).join(&attempt_dir);
        let logdir = self.log_root.join(&safe_shard).join(&attempt_dir);

        // Each attempt starts from clean directories.
        let _ = tokio::fs::remove_dir_all(&workdir).await;
        let _ = tokio::fs::remove_dir_all(&logdir).await;
        tokio::fs::create_dir_all(&workdir)
            .await
            .with_context(|| format!("create work dir {}", workdir.display()))?;
        tokio::fs::create_dir_all(&logdir)
            .await
            .with_context(|| format!("create log dir {}", logdir.display()))?;

        info!(shard_key, fuzzer_key, attempt, "running shard");
        let status = tokio::process::Command::new("bash")
            .arg(&script)
            .env("SFB_QUEUE_MODE", "1")
            .env("SFB_WORKDIR", &workdir)
            .env("SFB_LOG_DIR", &logdir)
            .env("SFB_SHARD_KEY", shard_key)
            .env("SFB_SHARD_ATTEMPT", attempt.to_string())
            .status()
            .await
            .with_context(|| format!("spawn runner {}", script.display()))?;

        // A signal-terminated runner has no code; classify it as failure.
        Ok(status.code().unwrap_or(-1))
    }
}
