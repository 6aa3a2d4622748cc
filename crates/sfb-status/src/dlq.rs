//! Dead-letter writer.

use anyhow::{Context, Result};
use sfb_schemas::dlq::DlqDoc;
use sfb_schemas::keys::RunScope;
use sfb_schemas::shard::ShardDoc;
use sfb_schemas::time::iso_utc_now;
use sfb_store::{put_json, ObjectStore};

/// Record a permanently failed shard attempt under
/// `dlq/<sanitized_shard>-<attempt>.json`. Write-once per final attempt; no
/// coordinator path reads it back.
pub async fn write_dlq_entry(
    store: &dyn ObjectStore,
    scope: &RunScope,
    shard: &ShardDoc,
    status: &str,
    exit_code: i32,
    worker_id: &str,
) -> Result<()> {
    let doc = DlqDoc {
        run_id: scope.run_id.clone(),
        benchmark_uuid: scope.benchmark_uuid.clone(),
        shard_key: shard.shard_key.clone(),
        fuzzer_key: shard.fuzzer_key.clone(),
        status: status.to_string(),
        attempt: shard.attempt,
        max_attempts: shard.max_attempts,
        exit_code,
        worker_id: worker_id.to_string(),
        failed_at: iso_utc_now(),
    };
    let key = scope.dlq_key(&shard.shard_key, shard.attempt);
    put_json(store, &key, &doc)
        .await
        .with_context(|| format!("write dlq entry {key}"))
}
