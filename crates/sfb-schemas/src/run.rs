//! Run-status document and its derivation from the shard population.

use serde::{Deserialize, Serialize};

use crate::shard::ShardStatus;

/// Per-status shard tally. `unknown` collects unrecognized statuses so they
/// are visible without counting as inflight work.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardCounts {
    #[serde(default)]
    pub queued: u32,
    #[serde(default)]
    pub running: u32,
    #[serde(default)]
    pub retrying: u32,
    #[serde(default)]
    pub succeeded: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub timed_out: u32,
    #[serde(default)]
    pub unknown: u32,
    #[serde(default)]
    pub total: u32,
}

impl ShardCounts {
    pub fn tally<I: IntoIterator<Item = ShardStatus>>(statuses: I) -> Self {
        let mut counts = ShardCounts::default();
        for status in statuses {
            counts.total += 1;
            match status {
                ShardStatus::Queued => counts.queued += 1,
                ShardStatus::Running => counts.running += 1,
                ShardStatus::Retrying => counts.retrying += 1,
                ShardStatus::Succeeded => counts.succeeded += 1,
                ShardStatus::Failed => counts.failed += 1,
                ShardStatus::TimedOut => counts.timed_out += 1,
                ShardStatus::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    pub fn inflight(&self) -> u32 {
        self.queued + self.running + self.retrying
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Succeeded,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Running => "running",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
        }
    }
}

/// Pure derivation of `(state, terminal)` from the counts.
///
/// A run is terminal once nothing is inflight and at least one shard exists;
/// it failed if any shard failed or timed out, succeeded otherwise.
pub fn derive_run_state(counts: &ShardCounts) -> (RunState, bool) {
    let terminal = counts.inflight() == 0 && counts.total > 0;
    if !terminal {
        return (RunState::Running, false);
    }
    if counts.failed + counts.timed_out > 0 {
        (RunState::Failed, true)
    } else {
        (RunState::Succeeded, true)
    }
}

/// `status/run.json`: the single authoritative summary of a run, rewritten
/// by every reconciliation pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunStatusDoc {
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub queue_mode: bool,
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub benchmark_uuid: String,
    pub state: RunState,
    #[serde(default)]
    pub terminal: bool,
    #[serde(default)]
    pub counts: ShardCounts,
    #[serde(default)]
    pub requested_shards: u32,
    #[serde(default)]
    pub max_parallel_instances: u32,
    #[serde(default)]
    pub shard_max_attempts: u32,
    #[serde(default)]
    pub lock_owner: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

fn default_mode() -> String {
    "s3_queue".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(q: u32, r: u32, re: u32, s: u32, f: u32, t: u32) -> ShardCounts {
        ShardCounts {
            queued: q,
            running: r,
            retrying: re,
            succeeded: s,
            failed: f,
            timed_out: t,
            unknown: 0,
            total: q + r + re + s + f + t,
        }
    }

    #[test]
    fn empty_population_is_running_not_terminal() {
        let (state, terminal) = derive_run_state(&ShardCounts::default());
        assert_eq!(state, RunState::Running);
        assert!(!terminal);
    }

    #[test]
    fn inflight_keeps_run_running() {
        let (state, terminal) = derive_run_state(&counts(1, 0, 0, 3, 0, 0));
        assert_eq!(state, RunState::Running);
        assert!(!terminal);

        let (state, terminal) = derive_run_state(&counts(0, 0, 1, 3, 1, 0));
        assert_eq!(state, RunState::Running);
        assert!(!terminal);
    }

    #[test]
    fn all_succeeded_is_terminal_success() {
        let (state, terminal) = derive_run_state(&counts(0, 0, 0, 4, 0, 0));
        assert_eq!(state, RunState::Succeeded);
        assert!(terminal);
    }

    #[test]
    fn any_failure_or_timeout_fails_the_run() {
        let (state, terminal) = derive_run_state(&counts(0, 0, 0, 3, 1, 0));
        assert_eq!(state, RunState::Failed);
        assert!(terminal);

        let (state, terminal) = derive_run_state(&counts(0, 0, 0, 3, 0, 1));
        assert_eq!(state, RunState::Failed);
        assert!(terminal);
    }

    #[test]
    fn unknown_statuses_count_in_total_but_not_inflight() {
        let statuses = vec![
            ShardStatus::Succeeded,
            ShardStatus::Unknown,
            ShardStatus::Succeeded,
        ];
        let counts = ShardCounts::tally(statuses);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.unknown, 1);
        assert_eq!(counts.inflight(), 0);
        // A run whose only non-terminal shard is unrecognized still closes.
        let (state, terminal) = derive_run_state(&counts);
        assert_eq!(state, RunState::Succeeded);
        assert!(terminal);
    }
}
