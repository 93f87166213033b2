//! In-memory [`ObjectStore`] used by the unit tests.

use super::{ObjectBody, ObjectStat, ObjectStore, ObjectSummary, StoreError, StoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

/// Store call that a test can force to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Bucket,
    Put,
    Get,
    Stat,
    List,
    Remove,
    Presign,
}

#[derive(Debug, Clone)]
struct StoredObject {
    payload: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
    etag: String,
}

/// Bucket contents held in a `BTreeMap`, so listings come back key-ordered
/// like S3's.
#[derive(Debug)]
pub struct MemoryStore {
    bucket: String,
    exists: AtomicBool,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failures: Mutex<HashMap<Op, StoreError>>,
    stalled: AtomicBool,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            exists: AtomicBool::new(true),
            objects: Mutex::new(BTreeMap::new()),
            failures: Mutex::new(HashMap::new()),
            stalled: AtomicBool::new(false),
        }
    }

    /// A store whose bucket has not been created yet.
    pub fn without_bucket(bucket: impl Into<String>) -> Self {
        let store = Self::new(bucket);
        store.exists.store(false, Ordering::SeqCst);
        store
    }

    /// Make every subsequent `op` call fail with `err`.
    pub fn fail(&self, op: Op, err: StoreError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    /// Make every subsequent call of any kind fail with `err`.
    pub fn fail_all(&self, err: StoreError) {
        let mut failures = self.failures.lock().unwrap();
        for op in [
            Op::Bucket,
            Op::Put,
            Op::Get,
            Op::Stat,
            Op::List,
            Op::Remove,
            Op::Presign,
        ] {
            failures.insert(op, err.clone());
        }
    }

    /// Make every subsequent call hang forever, like an unresponsive store.
    pub fn stall(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    async fn enter(&self, op: Op) -> StoreResult<()> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let failure = self.failures.lock().unwrap().get(&op).cloned();
        if let Some(err) = failure {
            return Err(err);
        }
        if op != Op::Bucket && !self.exists.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("bucket does not exist".into()));
        }
        Ok(())
    }

    async fn lookup(&self, op: Op, key: &str) -> StoreResult<StoredObject> {
        self.enter(op).await?;
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn bucket_exists(&self) -> StoreResult<bool> {
        self.enter(Op::Bucket).await?;
        Ok(self.exists.load(Ordering::SeqCst))
    }

    async fn create_bucket(&self, _region: &str) -> StoreResult<()> {
        self.enter(Op::Bucket).await?;
        self.exists.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn put_object(&self, key: &str, payload: Bytes, content_type: &str) -> StoreResult<()> {
        self.enter(Op::Put).await?;
        let etag = format!("{:x}", md5::compute(&payload));
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                payload,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
                etag,
            },
        );
        Ok(())
    }

    async fn get_object(&self, key: &str) -> StoreResult<ObjectBody> {
        let object = self.lookup(Op::Get, key).await?;
        // Two chunks, so consumers exercise real streaming.
        let mid = object.payload.len() / 2;
        let chunks = vec![
            Ok(object.payload.slice(..mid)),
            Ok(object.payload.slice(mid..)),
        ];
        Ok(ObjectBody {
            content_length: Some(object.payload.len() as u64),
            content_type: Some(object.content_type),
            stream: stream::iter(chunks).boxed(),
        })
    }

    async fn stat_object(&self, key: &str) -> StoreResult<ObjectStat> {
        let object = self.lookup(Op::Stat, key).await?;
        Ok(ObjectStat {
            size: object.payload.len() as u64,
            content_type: Some(object.content_type),
            last_modified: Some(object.last_modified),
            etag: Some(object.etag),
        })
    }

    async fn list_objects(&self) -> StoreResult<Vec<ObjectSummary>> {
        self.enter(Op::List).await?;
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                size: object.payload.len() as u64,
                last_modified: Some(object.last_modified),
                etag: Some(object.etag.clone()),
            })
            .collect())
    }

    async fn remove_object(&self, key: &str) -> StoreResult<()> {
        self.enter(Op::Remove).await?;
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StoreResult<String> {
        self.enter(Op::Presign).await?;
        Ok(format!(
            "memory://{}/{}?expires={}",
            self.bucket,
            key,
            expires_in.as_secs()
        ))
    }
}
