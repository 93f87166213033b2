//! Object-store client abstraction.
//!
//! The gateway only ever talks to the store through [`ObjectStore`], so the
//! S3 wire client and the in-memory test double are interchangeable. Every
//! method is a single round trip against the configured bucket.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::{io, time::Duration};
use thiserror::Error;

#[cfg(test)]
pub mod memory;
pub mod s3;

/// Outcome of a failed store call.
///
/// "No such key" is a variant of its own so callers never have to inspect
/// provider error codes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("object not found")]
    NotFound,
    #[error("object store unreachable: {0}")]
    Unreachable(String),
    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata returned by a HEAD-style call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    pub size: u64,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

/// One object as reported by a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

/// Streaming object payload.
///
/// Dropping the body releases the underlying connection, which is how an
/// aborted download stops the transfer.
pub struct ObjectBody {
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub stream: BoxStream<'static, io::Result<Bytes>>,
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBody")
            .field("content_length", &self.content_length)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Operations the gateway needs from an S3-compatible bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self) -> StoreResult<bool>;

    async fn create_bucket(&self, region: &str) -> StoreResult<()>;

    async fn put_object(&self, key: &str, payload: Bytes, content_type: &str) -> StoreResult<()>;

    async fn get_object(&self, key: &str) -> StoreResult<ObjectBody>;

    async fn stat_object(&self, key: &str) -> StoreResult<ObjectStat>;

    /// Every object in the bucket, all pages drained.
    async fn list_objects(&self) -> StoreResult<Vec<ObjectSummary>>;

    async fn remove_object(&self, key: &str) -> StoreResult<()>;

    /// GET-scoped presigned URL valid for `expires_in`.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StoreResult<String>;
}
