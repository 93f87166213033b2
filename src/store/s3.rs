//! [`ObjectStore`] backed by an S3-compatible endpoint through `aws-sdk-s3`.
//!
//! Path-style addressing is forced so MinIO and other self-hosted stores work
//! with a plain `host:port` endpoint. The SDK client is internally pooled and
//! cheap to share across requests.

use super::{ObjectBody, ObjectStat, ObjectStore, ObjectSummary, StoreError, StoreResult};
use crate::config::StoreConfig;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, timeout::TimeoutConfig},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    presigning::PresigningConfig,
    primitives::{ByteStream, DateTime as S3DateTime},
    types::{BucketLocationConstraint, CreateBucketConfiguration},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Region in which S3 rejects an explicit `LocationConstraint`.
const DEFAULT_S3_REGION: &str = "us-east-1";

#[derive(Clone, Debug)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client for the configured endpoint using static credentials.
    pub fn new(config: &StoreConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "object-gateway",
        );

        let sdk_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(config.endpoint_url())
            .force_path_style(true)
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(config.timeout)
                    .build(),
            )
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn bucket_exists(&self) -> StoreResult<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => match map_sdk_error(err, |e| e.is_not_found()) {
                StoreError::NotFound => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn create_bucket(&self, region: &str) -> StoreResult<()> {
        let mut req = self.client.create_bucket().bucket(&self.bucket);
        if region != DEFAULT_S3_REGION {
            req = req.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        match req.send().await {
            Ok(_) => Ok(()),
            // Another gateway instance won the race; the bucket is ours either way.
            Err(SdkError::ServiceError(ctx)) if ctx.err().is_bucket_already_owned_by_you() => {
                debug!(bucket = %self.bucket, "bucket already owned by us");
                Ok(())
            }
            Err(err) => Err(map_sdk_error(err, |_| false)),
        }
    }

    async fn put_object(&self, key: &str, payload: Bytes, content_type: &str) -> StoreResult<()> {
        let length = i64::try_from(payload.len())
            .map_err(|_| StoreError::Backend("payload too large".into()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(length)
            .body(ByteStream::from(payload))
            .send()
            .await
            .map_err(|err| map_sdk_error(err, |_| false))?;

        Ok(())
    }

    async fn get_object(&self, key: &str) -> StoreResult<ObjectBody> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| map_sdk_error(err, |e| e.is_no_such_key()))?;

        let content_length = output.content_length().and_then(|n| u64::try_from(n).ok());
        let content_type = output.content_type().map(ToOwned::to_owned);
        let stream = ReaderStream::new(output.body.into_async_read()).boxed();

        Ok(ObjectBody {
            content_length,
            content_type,
            stream,
        })
    }

    async fn stat_object(&self, key: &str) -> StoreResult<ObjectStat> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| map_sdk_error(err, |e| e.is_not_found()))?;

        Ok(ObjectStat {
            size: output
                .content_length()
                .and_then(|n| u64::try_from(n).ok())
                .unwrap_or(0),
            content_type: output.content_type().map(ToOwned::to_owned),
            last_modified: output.last_modified().and_then(to_chrono),
            etag: output.e_tag().map(ToOwned::to_owned),
        })
    }

    async fn list_objects(&self) -> StoreResult<Vec<ObjectSummary>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = self.client.list_objects_v2().bucket(&self.bucket);
            if let Some(token) = continuation_token.take() {
                req = req.continuation_token(token);
            }
            let resp = req
                .send()
                .await
                .map_err(|err| map_sdk_error(err, |_| false))?;

            for obj in resp.contents() {
                let Some(key) = obj.key() else {
                    continue;
                };
                objects.push(ObjectSummary {
                    key: key.to_owned(),
                    size: obj.size().and_then(|n| u64::try_from(n).ok()).unwrap_or(0),
                    last_modified: obj.last_modified().and_then(to_chrono),
                    etag: obj.e_tag().map(ToOwned::to_owned),
                });
            }

            continuation_token = resp.next_continuation_token().map(ToOwned::to_owned);
            if resp.is_truncated() != Some(true) || continuation_token.is_none() {
                break;
            }
        }

        Ok(objects)
    }

    async fn remove_object(&self, key: &str) -> StoreResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| map_sdk_error(err, |_| false))?;

        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StoreResult<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|err| StoreError::Backend(err.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|err| map_sdk_error(err, |_| false))?;

        Ok(request.uri().to_owned())
    }
}

/// Translate an SDK failure into the store's tagged error.
///
/// A modeled not-found variant or a bare HTTP 404 both count as
/// [`StoreError::NotFound`]; HEAD responses carry no body, so some stores
/// only ever report the status code.
fn map_sdk_error<E>(err: SdkError<E>, is_not_found: impl Fn(&E) -> bool) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let detail = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::ServiceError(ctx)
            if ctx.raw().status().as_u16() == 404 || is_not_found(ctx.err()) =>
        {
            StoreError::NotFound
        }
        SdkError::ServiceError(ctx) => {
            StoreError::Backend(ctx.err().message().unwrap_or(&detail).to_owned())
        }
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            StoreError::Unreachable(detail)
        }
        _ => StoreError::Backend(detail),
    }
}

fn to_chrono(ts: &S3DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}
