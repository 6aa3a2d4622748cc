//! Worker identity.
//!
//! Stable identity matters only for attribution (events, worker status,
//! claim provenance), so resolution degrades gracefully: EC2 instance id
//! via IMDSv2, then an explicit env override, then the hostname, then a
//! random suffix.

use std::time::Duration;

use sfb_config::{optional_env, ENV_INSTANCE_ID};
use tracing::debug;
use uuid::Uuid;

const IMDS_TOKEN_URL: &str = "http://169.254.169.254/latest/api/token";
const IMDS_INSTANCE_ID_URL: &str = "http://169.254.169.254/latest/meta-data/instance-id";
const IMDS_TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const IMDS_TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

pub async fn resolve_worker_id() -> String {
    if let Some(instance_id) = imds_instance_id().await {
        return instance_id;
    }
    if let Some(instance_id) = optional_env(ENV_INSTANCE_ID) {
        return instance_id;
    }
    let hostname = gethostname::gethostname().to_string_lossy().trim().to_string();
    if !hostname.is_empty() {
        return hostname;
    }
    let token = Uuid::new_v4().simple().to_string();
    format!("worker-{}", &token[..8])
}

/// IMDSv2 probe with tight timeouts: a token PUT, then the instance-id GET.
/// Any failure means we are not on EC2 (or IMDS is firewalled) and we fall
/// through silently.
async fn imds_instance_id() -> Option<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
        .ok()?;

    let token = client
        .put(IMDS_TOKEN_URL)
        .header(IMDS_TOKEN_TTL_HEADER, "21600")
        .send()
        .await
        .ok()?
        .error_for_status()
        .ok()?
        .text()
        .await
        .ok()?;
    let token = token.trim().to_string();
    if token.is_empty() {
        return None;
    }

    let instance_id = client
        .get(IMDS_INSTANCE_ID_URL)
        .header(IMDS_TOKEN_HEADER, &token)
        .send()
        .await
        .ok()?
        .error_for_status()
        .ok()?
        .text()
        .await
        .ok()?;
    let instance_id = instance_id.trim().to_string();
    if instance_id.is_empty() {
        None
    } else {
        debug!(%instance_id, "worker identity from IMDS");
        Some(instance_id)
    }
}
