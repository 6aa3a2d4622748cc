//! sfb-config
//!
//! The worker's environment contract. Every knob arrives as an `SFB_*`
//! variable; numbers are clamped to their documented floors rather than
//! rejected, matching how the deployment has always behaved. The one hard
//! validation is the lease/heartbeat ratio, because violating it makes lock
//! loss indistinguishable from normal operation.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use sfb_schemas::ids::validate_benchmark_uuid;
use sfb_schemas::keys::{RunScope, DEFAULT_LOCK_KEY};

pub const ENV_BUCKET: &str = "SFB_S3_BUCKET";
pub const ENV_RUN_ID: &str = "SFB_RUN_ID";
pub const ENV_BENCHMARK_UUID: &str = "SFB_BENCHMARK_UUID";
pub const ENV_LOCK_OWNER: &str = "SFB_LOCK_OWNER";
pub const ENV_LOCK_KEY: &str = "SFB_LOCK_KEY";
pub const ENV_SHARDS_JSON_B64: &str = "SFB_SHARDS_JSON_B64";
pub const ENV_MAX_PARALLEL_INSTANCES: &str = "SFB_MAX_PARALLEL_INSTANCES";
pub const ENV_SHARD_MAX_ATTEMPTS: &str = "SFB_SHARD_MAX_ATTEMPTS";
pub const ENV_LOCK_LEASE_SECONDS: &str = "SFB_LOCK_LEASE_SECONDS";
pub const ENV_LOCK_HEARTBEAT_SECONDS: &str = "SFB_LOCK_HEARTBEAT_SECONDS";
pub const ENV_LOCK_ACQUIRE_TIMEOUT_SECONDS: &str = "SFB_LOCK_ACQUIRE_TIMEOUT_SECONDS";
pub const ENV_POLL_SECONDS: &str = "SFB_QUEUE_POLL_SECONDS";
pub const ENV_IDLE_POLLS_BEFORE_EXIT: &str = "SFB_QUEUE_IDLE_POLLS_BEFORE_EXIT";
pub const ENV_INSTANCE_ID: &str = "SFB_INSTANCE_ID";
pub const ENV_FUZZERS_DIR: &str = "SFB_FUZZERS_DIR";
pub const ENV_WORK_DIR: &str = "SFB_WORK_DIR";
pub const ENV_LOG_DIR: &str = "SFB_LOG_DIR";
pub const ENV_AWS_PROFILE: &str = "AWS_PROFILE";

const DEFAULT_FUZZERS_DIR: &str = "/opt/scfuzzbench/fuzzers";
const DEFAULT_WORK_DIR: &str = "/opt/scfuzzbench/work";
const DEFAULT_LOG_DIR: &str = "/opt/scfuzzbench/logs";

/// Everything a queue worker needs to run one benchmark.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub bucket: String,
    pub run_id: String,
    pub benchmark_uuid: String,
    pub lock_owner: String,
    pub lock_key: String,
    pub shards_json_b64: String,
    pub max_parallel_instances: u32,
    pub shard_max_attempts: u32,
    pub lock_lease_seconds: i64,
    pub lock_heartbeat_seconds: i64,
    pub lock_acquire_timeout_seconds: i64,
    pub poll_seconds: i64,
    pub idle_polls_before_exit: u32,
    pub fuzzers_dir: PathBuf,
    pub work_dir: PathBuf,
    pub log_dir: PathBuf,
    pub aws_profile: Option<String>,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        let bucket = require_env(ENV_BUCKET)?;
        let run_id = require_env(ENV_RUN_ID)?;
        let benchmark_uuid = require_env(ENV_BENCHMARK_UUID)?;
        validate_benchmark_uuid(&benchmark_uuid)
            .with_context(|| format!("invalid {ENV_BENCHMARK_UUID}"))?;
        let lock_owner = require_env(ENV_LOCK_OWNER)?;
        let shards_json_b64 = require_env(ENV_SHARDS_JSON_B64)?;

        let lock_key = optional_env(ENV_LOCK_KEY).unwrap_or_else(|| DEFAULT_LOCK_KEY.to_string());

        let config = Self {
            bucket,
            run_id,
            benchmark_uuid,
            lock_owner,
            lock_key,
            shards_json_b64,
            max_parallel_instances: env_int(ENV_MAX_PARALLEL_INSTANCES, 1).max(1) as u32,
            shard_max_attempts: env_int(ENV_SHARD_MAX_ATTEMPTS, 3).max(1) as u32,
            lock_lease_seconds: env_int(ENV_LOCK_LEASE_SECONDS, 900).max(30),
            lock_heartbeat_seconds: env_int(ENV_LOCK_HEARTBEAT_SECONDS, 60).max(15),
            lock_acquire_timeout_seconds: env_int(ENV_LOCK_ACQUIRE_TIMEOUT_SECONDS, 0).max(0),
            poll_seconds: env_int(ENV_POLL_SECONDS, 15).max(5),
            idle_polls_before_exit: env_int(ENV_IDLE_POLLS_BEFORE_EXIT, 6).max(1) as u32,
            fuzzers_dir: env_path(ENV_FUZZERS_DIR, DEFAULT_FUZZERS_DIR),
            work_dir: env_path(ENV_WORK_DIR, DEFAULT_WORK_DIR),
            log_dir: env_path(ENV_LOG_DIR, DEFAULT_LOG_DIR),
            aws_profile: optional_env(ENV_AWS_PROFILE),
        };
        config.validate()?;
        Ok(config)
    }

    /// The one cross-field rule: heartbeats must fit three times into the
    /// lease, or a single slow renewal can silently lapse the lock.
    pub fn validate(&self) -> Result<()> {
        if self.lock_heartbeat_seconds > self.lock_lease_seconds / 3 {
            return Err(anyhow!(
                "{ENV_LOCK_HEARTBEAT_SECONDS} ({}) must be <= {ENV_LOCK_LEASE_SECONDS}/3 ({})",
                self.lock_heartbeat_seconds,
                self.lock_lease_seconds / 3
            ));
        }
        Ok(())
    }

    pub fn scope(&self) -> RunScope {
        RunScope::new(self.run_id.clone(), self.benchmark_uuid.clone())
    }
}

pub fn require_env(name: &str) -> Result<String> {
    let value = std::env::var(name).unwrap_or_default();
    let value = value.trim();
    if value.is_empty() {
        return Err(anyhow!("missing required env var: {name}"));
    }
    Ok(value.to_string())
}

pub fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an integer env var, falling back to `default` when unset or
/// unparseable.
pub fn env_int(name: &str, default: i64) -> i64 {
    optional_env(name)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

fn env_path(name: &str, default: &str) -> PathBuf {
    optional_env(name)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> WorkerConfig {
        WorkerConfig {
            bucket: "bench-bucket".into(),
            run_id: "1754000000".into(),
            benchmark_uuid: "0123456789abcdef0123456789abcdef".into(),
            lock_owner: "gha-12345".into(),
            lock_key: DEFAULT_LOCK_KEY.into(),
            shards_json_b64: "W10=".into(),
            max_parallel_instances: 1,
            shard_max_attempts: 3,
            lock_lease_seconds: 900,
            lock_heartbeat_seconds: 60,
            lock_acquire_timeout_seconds: 0,
            poll_seconds: 15,
            idle_polls_before_exit: 6,
            fuzzers_dir: DEFAULT_FUZZERS_DIR.into(),
            work_dir: DEFAULT_WORK_DIR.into(),
            log_dir: DEFAULT_LOG_DIR.into(),
            aws_profile: None,
        }
    }

    #[test]
    fn heartbeat_lease_ratio_is_enforced() {
        let mut config = base_config();
        assert!(config.validate().is_ok());

        config.lock_heartbeat_seconds = 300;
        assert!(config.validate().is_ok());

        config.lock_heartbeat_seconds = 301;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_int_falls_back_on_garbage() {
        // Unset name: deliberately unlikely to exist.
        assert_eq!(env_int("SFB_TEST_UNSET_SENTINEL", 42), 42);
    }
}
