//! Shared-index synchronization.
//!
//! A shared location holds a share token with the current record set of every
//! participant. Each run reloads the local index from disk, merges the shared set
//! into it, then publishes the merged result back. Records removed locally are
//! skipped by the merge, so the next publish drops them from the shared set too.

use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tempdrop_core::Clock;
use tempdrop_index::share::{decode_snapshot, encode_snapshot, extract_token};
use tempdrop_index::LocalIndex;

use crate::expiry_monitor::{notify, Notification, NotificationSender};
use crate::scheduler::ScheduledJob;

/// Where the shared snapshot lives.
#[async_trait]
pub trait SharedIndexSource: Send + Sync {
    /// The current share token, or `None` when nothing has been published yet.
    async fn fetch(&self) -> anyhow::Result<Option<String>>;

    async fn publish(&self, token: &str) -> anyhow::Result<()>;
}

/// Shared snapshot kept in a file, as a bare token or a full share link.
#[derive(Debug, Clone)]
pub struct FileSharedIndex {
    path: PathBuf,
}

impl FileSharedIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SharedIndexSource for FileSharedIndex {
    async fn fetch(&self) -> anyhow::Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let token = extract_token(&contents);
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read shared index {}", self.path.display())),
        }
    }

    async fn publish(&self, token: &str) -> anyhow::Result<()> {
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, token)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace shared index {}", self.path.display()))?;
        Ok(())
    }
}

/// Periodic merge with a [`SharedIndexSource`].
pub struct SyncJob {
    index: Arc<LocalIndex>,
    source: Arc<dyn SharedIndexSource>,
    notifications: NotificationSender,
}

impl SyncJob {
    pub fn new(
        index: Arc<LocalIndex>,
        source: Arc<dyn SharedIndexSource>,
        notifications: NotificationSender,
    ) -> Self {
        Self {
            index,
            source,
            notifications,
        }
    }

    /// Merge the shared snapshot in and publish the result. Returns how many
    /// records came in from the shared side.
    #[tracing::instrument(skip(self))]
    pub async fn sync_once(&self) -> anyhow::Result<usize> {
        // Pick up commands run by other processes since the last pass
        self.index.reload().await;

        let merged = match self.source.fetch().await? {
            Some(token) => {
                let records = decode_snapshot(
                    &token,
                    self.index.clock().now(),
                    self.index.retention(),
                )
                .context("Shared index is not a valid snapshot")?;
                self.index.import(&records).await?
            }
            None => 0,
        };

        if merged > 0 {
            tracing::info!(merged, "Merged records from shared index");
            notify(&self.notifications, Notification::SyncMerged { count: merged });
        }

        let current = self.index.read_all().await?;
        let token = encode_snapshot(&current)?;
        self.source.publish(&token).await?;

        Ok(merged)
    }
}

#[async_trait]
impl ScheduledJob for SyncJob {
    async fn run(&self) -> anyhow::Result<()> {
        if let Err(e) = self.sync_once().await {
            tracing::warn!(error = %e, "Shared index sync failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempdrop_core::{FileRecord, ManualClock};
    use tempdrop_index::share::build_share_url;
    use std::sync::Mutex;
    use tempdrop_storage::{DeleteOutcome, RemoteDeleter, StorageResult};
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    fn record(id: &str, clock: &ManualClock, hours_ago: i64) -> FileRecord {
        FileRecord::new_upload(
            id.to_string(),
            format!("{}.bin", id),
            1,
            "application/octet-stream".to_string(),
            format!("https://cdn/{}", id),
            id.to_string(),
            clock.now() - Duration::hours(hours_ago),
            Duration::hours(24),
        )
    }

    #[derive(Default)]
    struct CountingDeleter {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RemoteDeleter for CountingDeleter {
        async fn delete(&self, remote_id: &str, _file_type: &str) -> StorageResult<DeleteOutcome> {
            self.calls.lock().unwrap().push(remote_id.to_string());
            Ok(DeleteOutcome::Removed)
        }

        fn removes_remotely(&self) -> bool {
            true
        }
    }

    fn index(dir: &std::path::Path, clock: &ManualClock) -> Arc<LocalIndex> {
        index_with(dir, clock, Arc::default())
    }

    fn index_with(
        dir: &std::path::Path,
        clock: &ManualClock,
        deleter: Arc<CountingDeleter>,
    ) -> Arc<LocalIndex> {
        Arc::new(LocalIndex::new(
            dir.join("index.json"),
            Arc::new(clock.clone()),
            deleter,
            Duration::hours(24),
        ))
    }

    fn ids(records: Vec<FileRecord>) -> Vec<String> {
        records.into_iter().map(|r| r.id).collect()
    }

    #[tokio::test]
    async fn test_missing_shared_file_publishes_local_set() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let index = index(dir.path(), &clock);
        index.upsert(record("mine", &clock, 1)).await.unwrap();

        let shared_path = dir.path().join("shared.txt");
        let source = Arc::new(FileSharedIndex::new(&shared_path));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let job = SyncJob::new(index.clone(), source.clone(), tx);

        assert_eq!(job.sync_once().await.unwrap(), 0);
        assert!(rx.try_recv().is_err());

        let token = source.fetch().await.unwrap().unwrap();
        let published = decode_snapshot(&token, clock.now(), Duration::hours(24)).unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id, "mine");
    }

    #[tokio::test]
    async fn test_merges_shared_records() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let index = index(dir.path(), &clock);
        index.upsert(record("mine", &clock, 1)).await.unwrap();

        let shared_path = dir.path().join("shared.txt");
        let theirs = record("theirs", &clock, 2);
        let link = build_share_url("https://tempdrop.local/", &[theirs]).unwrap();
        std::fs::write(&shared_path, link).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let job = SyncJob::new(index.clone(), Arc::new(FileSharedIndex::new(&shared_path)), tx);

        assert_eq!(job.sync_once().await.unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap(), Notification::SyncMerged { count: 1 });

        assert_eq!(ids(index.read_all().await.unwrap()), vec!["mine", "theirs"]);

        // Second run is a no-op
        assert_eq!(job.sync_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_shared_file_is_logged_not_fatal() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let shared_path = dir.path().join("shared.txt");
        std::fs::write(&shared_path, "%%%").unwrap();

        let (tx, _rx) = mpsc::unbounded_channel();
        let source = Arc::new(FileSharedIndex::new(&shared_path));
        let job = SyncJob::new(index(dir.path(), &clock), source, tx);

        assert!(job.sync_once().await.is_err());
        assert!(job.run().await.is_ok());
    }

    #[tokio::test]
    async fn test_deleted_record_stays_deleted_after_sync() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let index = index(dir.path(), &clock);
        index.upsert(record("x", &clock, 1)).await.unwrap();
        index.upsert(record("y", &clock, 2)).await.unwrap();

        let shared_path = dir.path().join("shared.txt");
        let source = Arc::new(FileSharedIndex::new(&shared_path));
        let (tx, _rx) = mpsc::unbounded_channel();
        let job = SyncJob::new(index.clone(), source.clone(), tx);

        job.sync_once().await.unwrap();
        index.remove("x").await.unwrap();

        // The shared file still lists "x" from the first pass
        assert_eq!(job.sync_once().await.unwrap(), 0);
        assert_eq!(ids(index.read_all().await.unwrap()), vec!["y"]);

        // And the removal has been published
        let token = source.fetch().await.unwrap().unwrap();
        let published = decode_snapshot(&token, clock.now(), Duration::hours(24)).unwrap();
        assert_eq!(ids(published), vec!["y"]);

        assert_eq!(job.sync_once().await.unwrap(), 0);
        assert_eq!(ids(index.read_all().await.unwrap()), vec!["y"]);
    }

    #[tokio::test]
    async fn test_expired_record_is_not_resurrected_or_deleted_twice() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let deleter = Arc::new(CountingDeleter::default());
        let index = index_with(dir.path(), &clock, deleter.clone());
        index.upsert(record("old", &clock, 23)).await.unwrap();
        index.upsert(record("new", &clock, 0)).await.unwrap();

        let shared_path = dir.path().join("shared.txt");
        let (tx, _rx) = mpsc::unbounded_channel();
        let job = SyncJob::new(index.clone(), Arc::new(FileSharedIndex::new(&shared_path)), tx);
        job.sync_once().await.unwrap();

        clock.advance(Duration::hours(2));
        assert_eq!(ids(index.read_all().await.unwrap()), vec!["new"]);

        job.sync_once().await.unwrap();
        job.sync_once().await.unwrap();
        assert_eq!(ids(index.read_all().await.unwrap()), vec!["new"]);

        index.flush_pending_deletes().await;
        assert_eq!(*deleter.calls.lock().unwrap(), vec!["old".to_string()]);
    }

    #[tokio::test]
    async fn test_sync_sees_deletes_from_another_instance() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let watcher = index(dir.path(), &clock);
        watcher.upsert(record("x", &clock, 1)).await.unwrap();

        let shared_path = dir.path().join("shared.txt");
        let (tx, _rx) = mpsc::unbounded_channel();
        let job = SyncJob::new(watcher.clone(), Arc::new(FileSharedIndex::new(&shared_path)), tx);
        job.sync_once().await.unwrap();

        // A separate command on the same files
        let command = index(dir.path(), &clock);
        command.remove("x").await.unwrap();

        job.sync_once().await.unwrap();
        assert!(watcher.read_all().await.unwrap().is_empty());
    }
}
