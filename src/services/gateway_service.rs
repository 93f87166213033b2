//! src/services/gateway_service.rs
//!
//! GatewayService — the policy layer between the HTTP handlers and the object
//! store. It owns key naming, existence checks before destructive or signing
//! calls, the per-call timeout, and the translation of store failures into
//! [`GatewayError`]. It never retries and keeps no state besides the shared
//! store handle.

use crate::{
    config::StoreConfig,
    models::file::{AccessUrl, DeleteReceipt, ListingEntry, UploadReceipt},
    store::{ObjectBody, ObjectStore, StoreError, StoreResult},
};
use bytes::Bytes;
use chrono::Utc;
use std::{future::Future, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Lifetime of URLs handed out by [`GatewayService::access_url`].
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("file {key} does not exist")]
    ObjectNotFound { key: String },
    #[error("invalid upload: {0}")]
    InvalidUpload(String),
    #[error("error uploading file {key}: {reason}")]
    StorageWrite { key: String, reason: String },
    #[error("error reading file {key}: {reason}")]
    StorageRead { key: String, reason: String },
    #[error("error listing files: {0}")]
    StorageList(String),
    #[error("error deleting file {key}: {reason}")]
    StorageDelete { key: String, reason: String },
    #[error("error generating access url for {key}: {reason}")]
    Signing { key: String, reason: String },
    #[error("bucket `{bucket}` is not available: {reason}")]
    BucketSetup { bucket: String, reason: String },
    #[error("object store unreachable: {0}")]
    StorageConnectivity(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Stateless gateway over one bucket.
///
/// Cloning is cheap; every clone shares the same store handle.
#[derive(Clone)]
pub struct GatewayService {
    store: Arc<dyn ObjectStore>,
    config: Arc<StoreConfig>,
    clock: fn() -> i64,
}

impl GatewayService {
    pub fn new(store: Arc<dyn ObjectStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            config: Arc::new(config.clone()),
            clock: || Utc::now().timestamp_millis(),
        }
    }

    /// Replace the millisecond clock used for key generation.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Make sure the configured bucket exists, creating it when absent.
    ///
    /// Must complete before the service handles requests. Returns `true`
    /// when the bucket had to be created.
    pub async fn ensure_bucket(&self) -> GatewayResult<bool> {
        let bucket = self.bucket().to_string();
        let setup_error = |err: StoreError| match err {
            StoreError::Unreachable(detail) => GatewayError::StorageConnectivity(detail),
            other => GatewayError::BucketSetup {
                bucket: bucket.clone(),
                reason: other.to_string(),
            },
        };

        if self
            .bounded(self.store.bucket_exists())
            .await
            .map_err(&setup_error)?
        {
            debug!("bucket {} already exists", bucket);
            return Ok(false);
        }

        self.bounded(self.store.create_bucket(&self.config.region))
            .await
            .map_err(&setup_error)?;
        info!("created bucket {} in {}", bucket, self.config.region);
        Ok(true)
    }

    /// Readiness check: the bucket is reachable and present.
    pub async fn probe(&self) -> GatewayResult<()> {
        match self.bounded(self.store.bucket_exists()).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(GatewayError::BucketSetup {
                bucket: self.bucket().to_string(),
                reason: "bucket does not exist".into(),
            }),
            Err(StoreError::Unreachable(detail)) => Err(GatewayError::StorageConnectivity(detail)),
            Err(other) => Err(GatewayError::BucketSetup {
                bucket: self.bucket().to_string(),
                reason: other.to_string(),
            }),
        }
    }

    /// Write an uploaded file under a freshly generated key.
    pub async fn store(
        &self,
        payload: Bytes,
        original_name: &str,
        size: usize,
        content_type: &str,
    ) -> GatewayResult<UploadReceipt> {
        if payload.len() != size {
            return Err(GatewayError::InvalidUpload(format!(
                "declared size {} does not match payload length {}",
                size,
                payload.len()
            )));
        }

        let key = storage_key((self.clock)(), original_name);
        debug!("storing {} bytes as {} ({})", size, key, content_type);

        self.bounded(self.store.put_object(&key, payload, content_type))
            .await
            .map_err(|err| {
                warn!("upload of {} failed: {}", key, err);
                match err {
                    StoreError::Unreachable(detail) => GatewayError::StorageConnectivity(detail),
                    other => GatewayError::StorageWrite {
                        key: key.clone(),
                        reason: other.to_string(),
                    },
                }
            })?;

        info!("stored {}", key);
        Ok(UploadReceipt {
            message: format!("file {} uploaded successfully", key),
            file_name: key,
        })
    }

    /// Open a streaming read of `key`.
    ///
    /// The store itself is the existence check; its "not found" becomes
    /// [`GatewayError::ObjectNotFound`].
    pub async fn retrieve(&self, key: &str) -> GatewayResult<ObjectBody> {
        self.bounded(self.store.get_object(key))
            .await
            .map_err(|err| {
                classify(err, key, |reason| GatewayError::StorageRead {
                    key: key.to_string(),
                    reason,
                })
            })
    }

    /// Every object in the bucket with its public access URL.
    pub async fn list(&self) -> GatewayResult<Vec<ListingEntry>> {
        let objects = self
            .bounded(self.store.list_objects())
            .await
            .map_err(|err| match err {
                StoreError::Unreachable(detail) => GatewayError::StorageConnectivity(detail),
                other => GatewayError::StorageList(other.to_string()),
            })?;

        debug!("listed {} objects in {}", objects.len(), self.bucket());
        Ok(objects
            .into_iter()
            .map(|obj| ListingEntry {
                url: self.config.public_object_url(&obj.key),
                name: obj.key,
                size: obj.size,
                last_modified: obj.last_modified,
                etag: obj.etag,
            })
            .collect())
    }

    /// Presigned GET URL for an existing object, valid for [`SIGNED_URL_TTL`].
    pub async fn access_url(&self, key: &str) -> GatewayResult<AccessUrl> {
        let stat = self
            .bounded(self.store.stat_object(key))
            .await
            .map_err(|err| {
                classify(err, key, |reason| GatewayError::StorageRead {
                    key: key.to_string(),
                    reason,
                })
            })?;
        debug!(
            "signing {} ({} bytes, {:?}, etag {:?})",
            key, stat.size, stat.content_type, stat.etag
        );

        let url = self
            .bounded(self.store.presign_get(key, SIGNED_URL_TTL))
            .await
            .map_err(|err| {
                warn!("signing {} failed: {}", key, err);
                match err {
                    StoreError::Unreachable(detail) => GatewayError::StorageConnectivity(detail),
                    other => GatewayError::Signing {
                        key: key.to_string(),
                        reason: other.to_string(),
                    },
                }
            })?;

        Ok(AccessUrl { url })
    }

    /// Remove an object after confirming it exists.
    pub async fn delete(&self, key: &str) -> GatewayResult<DeleteReceipt> {
        let delete_error = |reason: String| GatewayError::StorageDelete {
            key: key.to_string(),
            reason,
        };

        let stat = self
            .bounded(self.store.stat_object(key))
            .await
            .map_err(|err| classify(err, key, delete_error))?;
        debug!(
            "deleting {} ({} bytes, last modified {:?})",
            key, stat.size, stat.last_modified
        );

        self.bounded(self.store.remove_object(key))
            .await
            .map_err(|err| classify(err, key, delete_error))?;

        info!("deleted {}", key);
        Ok(DeleteReceipt {
            message: format!("file {} deleted", key),
        })
    }

    /// Run one store call under the configured timeout.
    async fn bounded<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        let limit = self.config.timeout;
        tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
            Err(StoreError::Unreachable(format!(
                "no response within {:?}",
                limit
            )))
        })
    }
}

/// Map a per-key store failure; `otherwise` builds the operation's own error.
fn classify(
    err: StoreError,
    key: &str,
    otherwise: impl FnOnce(String) -> GatewayError,
) -> GatewayError {
    match err {
        StoreError::NotFound => GatewayError::ObjectNotFound {
            key: key.to_string(),
        },
        StoreError::Unreachable(detail) => GatewayError::StorageConnectivity(detail),
        StoreError::Backend(reason) => otherwise(reason),
    }
}

/// `<millis>-<name>` with every whitespace run in `name` collapsed to `_`.
pub fn storage_key(timestamp_millis: i64, original_name: &str) -> String {
    let mut sanitized = String::with_capacity(original_name.len());
    let mut in_whitespace = false;
    for c in original_name.chars() {
        if is_name_whitespace(c) {
            if !in_whitespace {
                sanitized.push('_');
            }
            in_whitespace = true;
        } else {
            sanitized.push(c);
            in_whitespace = false;
        }
    }
    format!("{}-{}", timestamp_millis, sanitized)
}

/// Whitespace set for key names: includes U+FEFF, excludes U+0085.
fn is_name_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\u{000B}'
            | '\u{000C}'
            | '\r'
            | ' '
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}
