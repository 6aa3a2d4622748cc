//! sfb-completion
//!
//! Read-only completion oracle. A run is complete when its status object is
//! terminal; otherwise a time-budget fallback compares the clock against
//! `run_id` (a start-time epoch) plus the manifest timeout and a grace
//! window. Nothing here mutates the store.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sfb_schemas::keys::RunScope;
use sfb_schemas::manifest::ManifestDoc;
use sfb_schemas::time::epoch_now;
use sfb_store::{get_json, ObjectStore};
use tracing::debug;

/// Run states older status payloads used before `terminal` existed.
const LEGACY_TERMINAL_STATES: [&str; 4] = ["succeeded", "failed", "timed_out", "completed"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    StatusTerminal,
    ManifestMissing,
    InvalidRunId,
    DeadlineMet,
    DeadlinePending,
}

impl CompletionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionReason::StatusTerminal => "status_terminal",
            CompletionReason::ManifestMissing => "manifest_missing",
            CompletionReason::InvalidRunId => "invalid_run_id",
            CompletionReason::DeadlineMet => "deadline_met",
            CompletionReason::DeadlinePending => "deadline_pending",
        }
    }
}

/// The oracle's verdict for one run.
#[derive(Clone, Debug, Serialize)]
pub struct Completion {
    pub run_id: String,
    pub benchmark_uuid: String,
    pub complete: bool,
    pub reason: CompletionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_hours: Option<f64>,
    pub queue_mode: bool,
    pub status_state: String,
    pub status_terminal: bool,
}

/// Loosely typed view of `status/run.json`; the oracle must read payloads
/// written by any coordinator version.
#[derive(Debug, Deserialize)]
struct StatusView {
    #[serde(default)]
    state: String,
    #[serde(default)]
    terminal: bool,
    #[serde(default)]
    mode: String,
    #[serde(default)]
    queue_mode: bool,
}

/// Evaluate one run. `now` is injectable for tests; `None` uses the clock.
pub async fn check_run_completion(
    store: &dyn ObjectStore,
    scope: &RunScope,
    grace_seconds: i64,
    now: Option<i64>,
) -> Result<Completion> {
    let now = now.unwrap_or_else(epoch_now);

    let status: Option<StatusView> = get_json(store, &scope.run_status_key())
        .await
        .context("read run status")?;
    let manifest: Option<ManifestDoc> = match get_json(store, &scope.manifest_key())
        .await
        .context("read manifest")?
    {
        Some(manifest) => Some(manifest),
        None => get_json(store, &scope.legacy_manifest_key())
            .await
            .context("read legacy manifest")?,
    };

    let timeout_hours = manifest.as_ref().map(|m| m.timeout_hours());

    let (status_state, status_terminal, queue_mode) = match &status {
        Some(view) => {
            let state = view.state.trim().to_ascii_lowercase();
            let terminal = view.terminal || LEGACY_TERMINAL_STATES.contains(&state.as_str());
            let queue_mode = view.queue_mode || view.mode.trim().eq_ignore_ascii_case("s3_queue");
            (state, terminal, queue_mode)
        }
        None => (String::new(), false, false),
    };

    let verdict = |complete: bool, reason: CompletionReason| Completion {
        run_id: scope.run_id.clone(),
        benchmark_uuid: scope.benchmark_uuid.clone(),
        complete,
        reason,
        timeout_hours,
        queue_mode,
        status_state: status_state.clone(),
        status_terminal,
    };

    if status_terminal {
        return Ok(verdict(true, CompletionReason::StatusTerminal));
    }
    let Some(timeout_hours) = timeout_hours else {
        return Ok(verdict(false, CompletionReason::ManifestMissing));
    };
    let Ok(run_start) = scope.run_id.parse::<i64>() else {
        return Ok(verdict(false, CompletionReason::InvalidRunId));
    };

    let deadline = run_start + (timeout_hours * 3600.0) as i64 + grace_seconds;
    if now >= deadline {
        Ok(verdict(true, CompletionReason::DeadlineMet))
    } else {
        debug!(
            run_id = %scope.run_id,
            deadline,
            now,
            "run still inside its time budget"
        );
        Ok(verdict(false, CompletionReason::DeadlinePending))
    }
}

/// Scan the bucket for run manifests and return the complete runs, newest
/// first (numeric `run_id` descending, then `benchmark_uuid`).
pub async fn discover_complete_runs(
    store: &dyn ObjectStore,
    grace_seconds: i64,
    now: Option<i64>,
) -> Result<Vec<Completion>> {
    let keys = store.list("runs/").await.context("list run manifests")?;

    let mut candidates: Vec<RunScope> = keys
        .iter()
        .filter_map(|key| parse_manifest_key(key))
        .collect();
    candidates.dedup();

    let mut complete = Vec::new();
    for scope in candidates {
        let completion = check_run_completion(store, &scope, grace_seconds, now).await?;
        if completion.complete {
            complete.push(completion);
        }
    }

    complete.sort_by(|a, b| {
        let a_id = a.run_id.parse::<i64>().unwrap_or(0);
        let b_id = b.run_id.parse::<i64>().unwrap_or(0);
        b_id.cmp(&a_id)
            .then_with(|| b.benchmark_uuid.cmp(&a.benchmark_uuid))
    });
    Ok(complete)
}

/// Match `runs/<digits>/<32 hex>/manifest.json`.
fn parse_manifest_key(key: &str) -> Option<RunScope> {
    let mut parts = key.split('/');
    if parts.next() != Some("runs") {
        return None;
    }
    let run_id = parts.next()?;
    let uuid = parts.next()?;
    if parts.next() != Some("manifest.json") || parts.next().is_some() {
        return None;
    }
    if run_id.is_empty() || !run_id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if sfb_schemas::ids::validate_benchmark_uuid(uuid).is_err() {
        return None;
    }
    Some(RunScope::new(run_id, uuid))
}
