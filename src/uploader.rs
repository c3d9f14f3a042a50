//! ==============================================================================
//! uploader.rs - spreadsheet replay into the remote store
//! ==============================================================================
//!
//! purpose:
//!     replays source rows as if they were arriving live. every cycle:
//!         1. overwrite `current`
//!         2. push to `history`
//!         3. trim `history` to the configured cap, oldest first
//!         4. refresh `metadata`
//!
//! failure handling:
//!     - malformed row: warn, skip, no tick consumed
//!     - store failure: error, next row on the next tick (no retry)
//!     - failed history delete: kept and retried on the next cycle
//!     - failed history listing or push: the key queue is re-listed from the
//!       store after the next successful push, so entries the uploader lost
//!       track of are still trimmed
//!
//! timing:
//!     one row per tick. a cycle's writes finish before the next tick is
//!     taken, and missed ticks are delayed rather than bunched up, so history
//!     stays in row order even when the store is slow.
//!
//! ==============================================================================

use std::time::Duration;

use chrono::Local;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::channels::HEADLINE_CHANNEL;
use crate::config::{Mode, UploadConfig};
use crate::domain::{Metadata, RunState, SensorReading, SharedStatus, UploadRecord};
use crate::error::{StoreError, UploadError};
use crate::history::BoundedHistory;
use crate::source::SourceRow;
use crate::store::RemoteStore;

pub struct Uploader<S> {
    store: S,
    rows: Vec<SourceRow>,
    history: BoundedHistory<String>,
    /// evicted keys whose remote delete has not succeeded yet
    pending_deletes: Vec<String>,
    /// the queue may be missing remote keys (failed listing or lost push
    /// reply); the next successful push re-lists before trimming
    stale: bool,
    cursor: usize,
    interval: Duration,
    status: SharedStatus,
}

impl<S: RemoteStore> Uploader<S> {
    pub fn new(store: S, rows: Vec<SourceRow>, config: &UploadConfig) -> Self {
        Self {
            store,
            rows,
            history: BoundedHistory::new(config.history_limit),
            pending_deletes: Vec::new(),
            stale: false,
            cursor: 0,
            interval: Duration::from_secs(config.interval_seconds.max(1)),
            status: SharedStatus::default(),
        }
    }

    /// handle for readers of the upload status (the status endpoint)
    pub fn status(&self) -> SharedStatus {
        self.status.clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// adopt the history already in the store so the cap covers earlier runs.
    /// anything over the cap is deleted right away. on failure the queue is
    /// marked stale and re-listed after the next successful push.
    pub async fn sync_history(&mut self) -> Result<(), StoreError> {
        let existing = match self.relist_history().await {
            Ok(n) => n,
            Err(e) => {
                self.stale = true;
                return Err(e);
            }
        };

        info!("found {} existing history records", existing);
        self.trim_history().await;
        self.status.write().await.history_len = self.history.len();
        Ok(())
    }

    /// rebuild the queue from the store's key listing. everything over the
    /// cap, including keys already waiting for deletion, becomes pending.
    async fn relist_history(&mut self) -> Result<usize, StoreError> {
        let keys = self.store.history_keys().await?;
        let existing = keys.len();

        let (history, surplus) = BoundedHistory::from_existing(self.history.capacity(), keys);
        self.history = history;
        self.pending_deletes = surplus;
        self.stale = false;
        Ok(existing)
    }

    pub async fn execute(&mut self, mode: Mode, single_index: usize) -> Result<(), UploadError> {
        match mode {
            Mode::Stream => {
                self.run(true).await;
                Ok(())
            }
            Mode::Once => {
                self.run(false).await;
                Ok(())
            }
            Mode::Single => self.upload_single(single_index).await,
        }
    }

    /// upload one row by 0-based index, for testing the pipeline end to end
    pub async fn upload_single(&mut self, index: usize) -> Result<(), UploadError> {
        let reading = match self.rows.get(index) {
            Some(Ok(reading)) => reading.clone(),
            Some(Err(e)) => return Err(e.clone().into()),
            None => {
                return Err(UploadError::InvalidIndex {
                    index,
                    len: self.rows.len(),
                })
            }
        };

        self.upload_reading(&reading).await?;
        self.cursor = index + 1;
        self.update_metadata(RunState::Completed).await;
        info!("single record uploaded: index {}", index);
        Ok(())
    }

    /// replay rows on the configured interval. with `loop_data` the replay
    /// wraps to the first row and only ends when the task is dropped.
    pub async fn run(&mut self, loop_data: bool) {
        let total = self.rows.len();
        info!(
            "starting real-time streaming ({}s interval, {} records)",
            self.interval.as_secs(),
            total
        );

        if self.rows.iter().all(|r| r.is_err()) {
            warn!("source has no usable records, nothing to upload");
            return;
        }

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.cursor >= total {
                if loop_data {
                    info!("reached end of data, looping back to start");
                    self.cursor = 0;
                } else {
                    self.update_metadata(RunState::Completed).await;
                    info!("finished uploading all data records");
                    break;
                }
            }

            let index = self.cursor;
            self.cursor += 1;

            let reading = match &self.rows[index] {
                Ok(reading) => reading.clone(),
                Err(e) => {
                    warn!("skipping malformed record: {}", e);
                    self.status.write().await.skipped += 1;
                    continue;
                }
            };

            ticker.tick().await;

            if let Err(e) = self.upload_reading(&reading).await {
                error!("upload failed: {}", e);
            }

            let progress = (index + 1) as f64 / total as f64 * 100.0;
            info!("progress: {:.1}% ({}/{})", progress, index + 1, total);

            self.update_metadata(RunState::Active).await;
        }
    }

    /// one cycle: current, history, trim
    pub async fn upload_reading(&mut self, reading: &SensorReading) -> Result<(), StoreError> {
        let record = UploadRecord::now(reading);

        let result = self.write_record(&record).await;

        let mut status = self.status.write().await;
        match &result {
            Ok(()) => {
                status.uploaded += 1;
                status.current = Some(record);
            }
            Err(_) => status.failed += 1,
        }
        status.history_len = self.history.len();

        result
    }

    async fn write_record(&mut self, record: &UploadRecord) -> Result<(), StoreError> {
        self.store.set_current(record).await?;

        // the push may have landed even if its reply did not
        let key = match self.store.push_history(record).await {
            Ok(key) => key,
            Err(e) => {
                self.stale = true;
                return Err(e);
            }
        };

        if self.stale {
            match self.relist_history().await {
                Ok(n) => info!("re-listed {} history records", n),
                Err(e) => {
                    warn!("history re-list failed, will retry: {}", e);
                    self.queue_key(key);
                }
            }
        } else {
            self.queue_key(key);
        }
        self.trim_history().await;

        match record.values.get(HEADLINE_CHANNEL) {
            Some(v) => info!("uploaded data point - clinker inlet: {:.1}°C", v),
            None => info!("uploaded data point"),
        }
        Ok(())
    }

    fn queue_key(&mut self, key: String) {
        if let Some(evicted) = self.history.push(key) {
            self.pending_deletes.push(evicted);
        }
    }

    async fn trim_history(&mut self) {
        if self.pending_deletes.is_empty() {
            return;
        }

        let mut kept = Vec::new();
        let mut cleaned = 0;
        for key in std::mem::take(&mut self.pending_deletes) {
            match self.store.delete_history(&key).await {
                Ok(()) => cleaned += 1,
                Err(e) => {
                    warn!("history cleanup failed for {}: {}", key, e);
                    kept.push(key);
                }
            }
        }
        self.pending_deletes = kept;

        if cleaned > 0 {
            info!("cleaned {} old records from history", cleaned);
        }
    }

    async fn update_metadata(&mut self, state: RunState) {
        let metadata = Metadata {
            last_update: Local::now().to_rfc3339(),
            current_index: self.cursor,
            total_records: self.rows.len(),
            update_interval_seconds: self.interval.as_secs(),
            status: state,
        };

        if let Err(e) = self.store.set_metadata(&metadata).await {
            warn!("metadata update failed: {}", e);
        } else {
            debug!("metadata updated: index {}", metadata.current_index);
        }
        self.status.write().await.metadata = Some(metadata);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::BTreeMap;

    fn reading(v: f64) -> SourceRow {
        Ok(SensorReading {
            recorded_at: None,
            values: BTreeMap::from([(HEADLINE_CHANNEL.to_string(), v)]),
        })
    }

    fn config(limit: usize) -> UploadConfig {
        UploadConfig {
            history_limit: limit,
            ..UploadConfig::default()
        }
    }

    #[tokio::test]
    async fn single_upload_out_of_range() {
        let mut uploader = Uploader::new(MemoryStore::new(), vec![reading(1.0)], &config(10));
        let err = uploader.upload_single(3).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidIndex { index: 3, len: 1 }));
        assert!(uploader.store().current().is_none());
    }

    #[tokio::test]
    async fn single_upload_writes_current_and_history() {
        let rows = vec![reading(1.0), reading(2.0)];
        let mut uploader = Uploader::new(MemoryStore::new(), rows, &config(10));
        uploader.upload_single(1).await.unwrap();

        let store = uploader.store();
        assert_eq!(store.current().unwrap().values[HEADLINE_CHANNEL], 2.0);
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.metadata().unwrap().status, RunState::Completed);
    }

    #[tokio::test]
    async fn failed_delete_is_retried() {
        let rows = (0..3).map(|i| reading(i as f64)).collect();
        let mut uploader = Uploader::new(MemoryStore::new(), rows, &config(1));

        uploader.store().set_fail_deletes(true);
        uploader.upload_single(0).await.unwrap();
        uploader.upload_single(1).await.unwrap();
        assert_eq!(uploader.store().history().len(), 2);

        uploader.store().set_fail_deletes(false);
        uploader.upload_single(2).await.unwrap();
        let history = uploader.store().history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].values[HEADLINE_CHANNEL], 2.0);
    }

    #[tokio::test]
    async fn status_counts_failures() {
        let mut uploader = Uploader::new(MemoryStore::new(), vec![reading(1.0)], &config(10));
        uploader.store().set_fail_writes(true);
        assert!(uploader.upload_single(0).await.is_err());

        let status = uploader.status();
        let status = status.read().await;
        assert_eq!(status.failed, 1);
        assert_eq!(status.uploaded, 0);
        assert!(status.current.is_none());
    }
}
