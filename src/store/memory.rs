use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::RemoteStore;
use crate::domain::{Metadata, UploadRecord};
use crate::error::StoreError;

#[derive(Default)]
struct Inner {
    current: Option<UploadRecord>,
    history: Vec<(String, UploadRecord)>,
    metadata: Option<Metadata>,
}

/// process-local store. keys are zero-padded sequence numbers so they sort
/// in push order, like firebase push ids.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    next_key: AtomicU64,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
    fail_listing: AtomicBool,
    drop_push_reply: AtomicBool,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// make every write fail until switched back
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn current(&self) -> Option<UploadRecord> {
        self.lock().current.clone()
    }

    pub fn history(&self) -> Vec<UploadRecord> {
        self.lock().history.iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn metadata(&self) -> Option<Metadata> {
        self.lock().metadata.clone()
    }

    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// store pushed records but report the push as failed, like a reply lost
    /// to a timeout
    pub fn set_drop_push_reply(&self, drop: bool) {
        self.drop_push_reply.store(drop, Ordering::SeqCst);
    }

    /// successful writes of any kind
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is failing writes".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn set_current(&self, record: &UploadRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        self.lock().current = Some(record.clone());
        Ok(())
    }

    async fn push_history(&self, record: &UploadRecord) -> Result<String, StoreError> {
        self.check_writable()?;
        let key = format!("{:020}", self.next_key.fetch_add(1, Ordering::SeqCst));
        self.lock().history.push((key.clone(), record.clone()));
        if self.drop_push_reply.load(Ordering::SeqCst) {
            return Err(StoreError::Response("push reply lost".into()));
        }
        Ok(key)
    }

    async fn delete_history(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is failing deletes".into()));
        }
        self.check_writable()?;
        self.lock().history.retain(|(k, _)| k != key);
        Ok(())
    }

    async fn history_keys(&self) -> Result<Vec<String>, StoreError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is failing listings".into()));
        }
        Ok(self.lock().history.iter().map(|(k, _)| k.clone()).collect())
    }

    async fn set_metadata(&self, metadata: &Metadata) -> Result<(), StoreError> {
        self.check_writable()?;
        self.lock().metadata = Some(metadata.clone());
        Ok(())
    }
}
