//! S3 implementation of [`ObjectStore`].
//!
//! Every call classifies SDK failures into the [`StoreError`] taxonomy and
//! retries transient kinds with bounded exponential back-off before
//! surfacing them.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::{ObjectStore, RawObject, StoreError, StoreResult};

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client from the ambient AWS environment (env vars, shared
    /// config, instance profile), optionally pinned to a named profile.
    pub async fn connect(bucket: impl Into<String>, profile: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;
        Self {
            client: Client::new(&config),
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

enum FailureKind {
    NotFound,
    Precondition,
    Transient,
    Fatal,
}

type Failure = (FailureKind, String);

fn transient_code(code: &str) -> bool {
    matches!(
        code,
        "SlowDown"
            | "ServiceUnavailable"
            | "InternalError"
            | "RequestTimeout"
            | "Throttling"
            | "ThrottlingException"
            | "RequestLimitExceeded"
            | "503"
    )
}

fn classify<E: ProvideErrorMetadata>(err: &SdkError<E>) -> Failure {
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            (FailureKind::Transient, message)
        }
        SdkError::ServiceError(_) => match err.code().unwrap_or("") {
            "NoSuchKey" | "NotFound" | "404" => (FailureKind::NotFound, message),
            // 412 from `If-None-Match: *`, or 409 when two conditional
            // writes collide in flight.
            "PreconditionFailed" | "ConditionalRequestConflict" => {
                (FailureKind::Precondition, message)
            }
            code if transient_code(code) => (FailureKind::Transient, message),
            _ => (FailureKind::Fatal, message),
        },
        _ => (FailureKind::Fatal, message),
    }
}

/// Run `call`, retrying transient failures with exponential back-off.
/// Non-transient failures surface immediately.
async fn with_retry<T, F, Fut>(operation: &'static str, key: &str, mut call: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Failure>>,
{
    let mut last_message = String::new();
    for attempt in 1..=RETRY_ATTEMPTS {
        match call().await {
            Ok(value) => return Ok(value),
            Err((FailureKind::NotFound, _)) => {
                return Err(StoreError::NotFound { key: key.to_string() })
            }
            Err((FailureKind::Precondition, _)) => {
                return Err(StoreError::PreconditionFailed { key: key.to_string() })
            }
            Err((FailureKind::Fatal, message)) => {
                return Err(StoreError::Fatal {
                    operation,
                    key: key.to_string(),
                    message,
                })
            }
            Err((FailureKind::Transient, message)) => {
                debug!(operation, key, attempt, %message, "transient store failure");
                last_message = message;
                if attempt < RETRY_ATTEMPTS {
                    tokio::time::sleep(RETRY_BASE_DELAY * 2u32.pow(attempt - 1)).await;
                }
            }
        }
    }
    Err(StoreError::Transient {
        operation,
        key: key.to_string(),
        attempts: RETRY_ATTEMPTS,
        message: last_message,
    })
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get(&self, key: &str) -> StoreResult<Option<RawObject>> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key_owned = key.to_string();
        with_retry("get", key, move || {
            let client = client.clone();
            let bucket = bucket.clone();
            let key = key_owned.clone();
            async move {
                let out = match client.get_object().bucket(&bucket).key(&key).send().await {
                    Ok(out) => out,
                    Err(err) => {
                        return match classify(&err) {
                            (FailureKind::NotFound, _) => Ok(None),
                            failure => Err(failure),
                        }
                    }
                };
                let etag = out.e_tag().map(str::to_string);
                match out.body.collect().await {
                    Ok(data) => Ok(Some(RawObject {
                        bytes: data.into_bytes().to_vec(),
                        etag,
                    })),
                    // A torn body read is as retryable as a failed dispatch.
                    Err(err) => Err((FailureKind::Transient, err.to_string())),
                }
            }
        })
        .await
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> StoreResult<()> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key_owned = key.to_string();
        let content_type = content_type.to_string();
        with_retry("put", key, move || {
            let client = client.clone();
            let bucket = bucket.clone();
            let key = key_owned.clone();
            let content_type = content_type.clone();
            let body = body.clone();
            async move {
                client
                    .put_object()
                    .bucket(&bucket)
                    .key(&key)
                    .content_type(&content_type)
                    .body(ByteStream::from(body))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|err| classify(&err))
            }
        })
        .await
    }

    async fn put_if_absent(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> StoreResult<()> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key_owned = key.to_string();
        let content_type = content_type.to_string();
        with_retry("put_if_absent", key, move || {
            let client = client.clone();
            let bucket = bucket.clone();
            let key = key_owned.clone();
            let content_type = content_type.clone();
            let body = body.clone();
            async move {
                client
                    .put_object()
                    .bucket(&bucket)
                    .key(&key)
                    .content_type(&content_type)
                    .if_none_match("*")
                    .body(ByteStream::from(body))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|err| classify(&err))
            }
        })
        .await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key_owned = key.to_string();
        with_retry("delete", key, move || {
            let client = client.clone();
            let bucket = bucket.clone();
            let key = key_owned.clone();
            async move {
                match client.delete_object().bucket(&bucket).key(&key).send().await {
                    Ok(_) => Ok(()),
                    Err(err) => match classify(&err) {
                        (FailureKind::NotFound, _) => Ok(()),
                        failure => Err(failure),
                    },
                }
            }
        })
        .await
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let prefix_owned = prefix.to_string();
        let mut keys = with_retry("list", prefix, move || {
            let client = client.clone();
            let bucket = bucket.clone();
            let prefix = prefix_owned.clone();
            async move {
                let mut keys = Vec::new();
                let mut token: Option<String> = None;
                loop {
                    let mut req = client.list_objects_v2().bucket(&bucket).prefix(&prefix);
                    if let Some(t) = &token {
                        req = req.continuation_token(t);
                    }
                    let out = req.send().await.map_err(|err| classify(&err))?;
                    for obj in out.contents() {
                        if let Some(key) = obj.key() {
                            keys.push(key.to_string());
                        }
                    }
                    if !out.is_truncated().unwrap_or(false) {
                        break;
                    }
                    token = out.next_continuation_token().map(str::to_string);
                    if token.is_none() {
                        break;
                    }
                }
                Ok(keys)
            }
        })
        .await?;
        keys.sort();
        Ok(keys)
    }
}
