use chrono::{DateTime, Duration, Utc};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use tempdrop_core::{Clock, FileRecord};
use tempdrop_storage::RemoteDeleter;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::error::{IndexError, IndexResult};
use crate::reconcile::{merge, sort_newest_first};
use crate::sweep::partition_expired;

/// Ids removed from the index, with the time they were removed.
type Tombstones = BTreeMap<String, DateTime<Utc>>;

/// In-memory copy of the index files, loaded on first access.
#[derive(Default)]
struct IndexState {
    records: Option<Vec<FileRecord>>,
    removed: Tombstones,
    /// Loading dropped or back-filled entries, or the last sweep could not be
    /// written; the next read persists the cleaned set.
    dirty: bool,
}

/// Result of one read with expiry sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Remaining records, newest upload first.
    pub valid: Vec<FileRecord>,
    /// Ids dropped by this sweep.
    pub expired_ids: Vec<String>,
}

/// Durable local index of file records
///
/// The whole record set lives in one JSON file and is rewritten wholesale on every
/// change. All reads and writes go through a single async mutex around the owned
/// in-memory state, so concurrent callers (user commands, timers, sync) never
/// interleave between read and write inside one process.
///
/// Reading runs the expiry sweep: expired records are dropped and persisted away
/// immediately, and their remote deletion is spawned in the background.
///
/// Ids that leave the index (deleted or expired) are remembered in a sidecar file
/// for one retention period, so [`LocalIndex::import`] does not bring them back
/// from an older snapshot.
pub struct LocalIndex {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    deleter: Arc<dyn RemoteDeleter>,
    retention: Duration,
    state: Mutex<IndexState>,
    pending_deletes: StdMutex<JoinSet<()>>,
}

impl LocalIndex {
    /// Create an index backed by `path`. The file is created on first write.
    pub fn new(
        path: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        deleter: Arc<dyn RemoteDeleter>,
        retention: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            clock,
            deleter,
            retention,
            state: Mutex::new(IndexState::default()),
            pending_deletes: StdMutex::new(JoinSet::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sidecar file holding the ids removed within the last retention period.
    pub fn removed_path(&self) -> PathBuf {
        self.path.with_extension("removed.json")
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// All valid records, newest upload first.
    ///
    /// Malformed entries are skipped; an unparseable file is reset to empty. Expired
    /// records are removed and their remote deletion attempted in the background.
    pub async fn read_all(&self) -> IndexResult<Vec<FileRecord>> {
        Ok(self.sweep().await?.valid)
    }

    /// Same as [`LocalIndex::read_all`], also reporting which records expired.
    ///
    /// Expired records leave the cached state even when writing the swept set
    /// fails, so their remote delete is spawned only once. The file keeps them
    /// until a later write succeeds; a [`LocalIndex::reload`] before that brings
    /// them back and sweeps them again.
    #[tracing::instrument(skip(self), fields(index.path = %self.path.display()))]
    pub async fn sweep(&self) -> IndexResult<SweepReport> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let records = self.loaded(&mut state).await?.clone();

        let (mut valid, expired) = partition_expired(records, now);
        sort_newest_first(&mut valid);

        if !expired.is_empty() || state.dirty {
            let mut removed = state.removed.clone();
            removed.extend(expired.iter().map(|r| (r.id.clone(), now)));
            self.prune_removed(&mut removed, now);

            match self.write_state(&valid, &removed, &state.removed).await {
                Ok(()) => state.dirty = false,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to persist swept index");
                    state.dirty = true;
                }
            }
            state.records = Some(valid.clone());
            state.removed = removed;
        }

        let expired_ids = expired.iter().map(|r| r.id.clone()).collect();
        if !expired.is_empty() {
            tracing::info!(
                expired = expired.len(),
                remaining = valid.len(),
                "Expired files removed from index"
            );
            self.spawn_remote_deletes(expired);
        }

        Ok(SweepReport { valid, expired_ids })
    }

    /// Look up one record without sweeping.
    pub async fn get(&self, id: &str) -> IndexResult<Option<FileRecord>> {
        let mut state = self.state.lock().await;
        let records = self.loaded(&mut state).await?;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    /// Insert a record or replace the one with the same id.
    pub async fn upsert(&self, record: FileRecord) -> IndexResult<()> {
        self.mutate(|records, removed| {
            removed.remove(&record.id);
            match records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
            Ok(())
        })
        .await
    }

    /// Replace an existing record.
    pub async fn update_by_id(&self, id: &str, record: FileRecord) -> IndexResult<()> {
        self.mutate(|records, _| {
            let existing = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| IndexError::NotFound(id.to_string()))?;
            *existing = record;
            Ok(())
        })
        .await
    }

    /// Remove a record by id. Unknown ids are ignored.
    pub async fn remove(&self, id: &str) -> IndexResult<()> {
        self.remove_batch(&[id.to_string()]).await
    }

    /// Remove several records by id. Unknown ids are ignored.
    pub async fn remove_batch(&self, ids: &[String]) -> IndexResult<()> {
        let now = self.clock.now();
        self.mutate(|records, removed| {
            records.retain(|r| {
                let keep = !ids.contains(&r.id);
                if !keep {
                    removed.insert(r.id.clone(), now);
                }
                keep
            });
            Ok(())
        })
        .await
    }

    /// Merge incoming records (share link, shared index) into the index.
    ///
    /// Records already expired, and ids removed here within the retention period,
    /// are skipped. Returns how many records were added or replaced.
    pub async fn import(&self, incoming: &[FileRecord]) -> IndexResult<usize> {
        let now = self.clock.now();
        let mut changed = 0;
        self.mutate(|records, removed| {
            let accepted: Vec<FileRecord> = incoming
                .iter()
                .filter(|r| !r.is_expired(now) && !removed.contains_key(&r.id))
                .cloned()
                .collect();
            if accepted.len() < incoming.len() {
                tracing::debug!(
                    skipped = incoming.len() - accepted.len(),
                    "Skipped expired or removed records on import"
                );
            }

            let merged = merge(records, &accepted);
            changed = merged.iter().filter(|r| !records.contains(r)).count();
            *records = merged;
            Ok(())
        })
        .await?;
        Ok(changed)
    }

    /// Drop the cached state so the next access reloads the files.
    pub async fn reload(&self) {
        let mut state = self.state.lock().await;
        *state = IndexState::default();
    }

    /// Wait for background expiry deletes spawned so far.
    pub async fn flush_pending_deletes(&self) {
        let mut pending = {
            let mut guard = self
                .pending_deletes
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        while pending.join_next().await.is_some() {}
    }

    /// Read-modify-write under the state lock. The cached state only changes when
    /// the write succeeded.
    async fn mutate<F>(&self, apply: F) -> IndexResult<()>
    where
        F: FnOnce(&mut Vec<FileRecord>, &mut Tombstones) -> IndexResult<()>,
    {
        let mut state = self.state.lock().await;
        let mut records = self.loaded(&mut state).await?.clone();
        let mut removed = state.removed.clone();
        self.prune_removed(&mut removed, self.clock.now());

        apply(&mut records, &mut removed)?;
        sort_newest_first(&mut records);

        self.write_state(&records, &removed, &state.removed).await?;
        state.records = Some(records);
        state.removed = removed;
        state.dirty = false;
        Ok(())
    }

    async fn loaded<'a>(
        &self,
        state: &'a mut IndexState,
    ) -> IndexResult<&'a mut Vec<FileRecord>> {
        if state.records.is_none() {
            let (records, dirty) = self.load().await?;
            state.removed = self.load_removed().await?;
            state.records = Some(records);
            state.dirty = dirty;
        }
        Ok(state.records.get_or_insert_with(Vec::new))
    }

    /// Read the index file. Returns the restored records and whether the file
    /// needs rewriting.
    async fn load(&self) -> IndexResult<(Vec<FileRecord>, bool)> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), false)),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok((Vec::new(), false));
        }

        let entries = match serde_json::from_str::<JsonValue>(&contents) {
            Ok(JsonValue::Array(entries)) => entries,
            Ok(_) | Err(_) => {
                tracing::error!(
                    path = %self.path.display(),
                    "Index file is unreadable, resetting to empty"
                );
                if let Err(e) = self.persist(&[]).await {
                    tracing::error!(error = %e, "Failed to reset index file");
                }
                return Ok((Vec::new(), false));
            }
        };

        let now = self.clock.now();
        let mut backfilled = false;
        let restored: Vec<FileRecord> = entries
            .iter()
            .filter_map(|entry| FileRecord::restore(entry, now, self.retention))
            .map(|r| {
                backfilled |= r.backfilled;
                r.record
            })
            .collect();

        let dropped = entries.len() - restored.len();
        if dropped > 0 {
            tracing::debug!(dropped, "Skipped malformed index entries");
        }

        let records = merge(&restored, &[]);
        let dirty = backfilled || dropped > 0 || records.len() != restored.len();

        Ok((records, dirty))
    }

    /// Read the removed-ids sidecar. A damaged file only loses the history.
    async fn load_removed(&self) -> IndexResult<Tombstones> {
        let path = self.removed_path();
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Tombstones::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Tombstones>(&contents) {
            Ok(mut removed) => {
                self.prune_removed(&mut removed, self.clock.now());
                Ok(removed)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "Removed-ids file is unreadable, ignoring it"
                );
                Ok(Tombstones::new())
            }
        }
    }

    /// Forget removals older than the retention period; any copy of those records
    /// has expired by then.
    fn prune_removed(&self, removed: &mut Tombstones, now: DateTime<Utc>) {
        let retention = self.retention;
        removed.retain(|_, removed_at| *removed_at + retention > now);
    }

    /// Write the removed ids (when they changed) and then the records.
    async fn write_state(
        &self,
        records: &[FileRecord],
        removed: &Tombstones,
        previous: &Tombstones,
    ) -> IndexResult<()> {
        if removed != previous {
            let json = serde_json::to_vec_pretty(removed)?;
            write_atomic(&self.removed_path(), &json).await?;
        }
        self.persist(records).await
    }

    /// Atomically replace the index file.
    async fn persist(&self, records: &[FileRecord]) -> IndexResult<()> {
        let json = serde_json::to_vec_pretty(records)?;
        write_atomic(&self.path, &json).await?;

        tracing::debug!(
            path = %self.path.display(),
            records = records.len(),
            size_bytes = json.len(),
            "Index persisted"
        );
        Ok(())
    }

    fn spawn_remote_deletes(&self, expired: Vec<FileRecord>) {
        let mut pending = self
            .pending_deletes
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        // Reap finished tasks so the set does not grow without bound
        while pending.try_join_next().is_some() {}

        for record in expired {
            let deleter = self.deleter.clone();
            pending.spawn(async move {
                match deleter.delete(&record.remote_id, &record.file_type).await {
                    Ok(outcome) => {
                        tracing::debug!(
                            record_id = %record.id,
                            remote_id = %record.remote_id,
                            outcome = ?outcome,
                            "Expired file deleted"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            record_id = %record.id,
                            remote_id = %record.remote_id,
                            "Failed to delete expired file from remote store"
                        );
                    }
                }
            });
        }
    }
}

/// Write to a temp file beside `path`, then rename over it.
async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut file = fs::File::create(&tmp_path).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp_path, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use tempdrop_core::ManualClock;
    use tempdrop_storage::{DeleteOutcome, StorageError, StorageResult};
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingDeleter {
        calls: StdMutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl RemoteDeleter for RecordingDeleter {
        async fn delete(&self, remote_id: &str, _file_type: &str) -> StorageResult<DeleteOutcome> {
            self.calls.lock().unwrap().push(remote_id.to_string());
            if self.fail {
                Err(StorageError::DeleteFailed("provider down".to_string()))
            } else {
                Ok(DeleteOutcome::Removed)
            }
        }

        fn removes_remotely(&self) -> bool {
            true
        }
    }

    fn record(id: &str, clock: &ManualClock, uploaded_hours_ago: i64) -> FileRecord {
        let uploaded = clock.now() - Duration::hours(uploaded_hours_ago);
        FileRecord {
            id: id.to_string(),
            file_name: format!("{}.txt", id),
            upload_time: uploaded,
            expires_at: uploaded + Duration::hours(24),
            file_size: 10,
            remote_url: format!("https://cdn/{}", id),
            file_type: "text/plain".to_string(),
            remote_id: format!("remote-{}", id),
        }
    }

    fn index_at(path: &Path, clock: &ManualClock, deleter: Arc<RecordingDeleter>) -> LocalIndex {
        LocalIndex::new(path, Arc::new(clock.clone()), deleter, Duration::hours(24))
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let index = index_at(&dir.path().join("index.json"), &clock, Arc::default());
        assert!(index.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let path = dir.path().join("index.json");
        let index = index_at(&path, &clock, Arc::default());

        let mut a = record("a", &clock, 1);
        index.upsert(a.clone()).await.unwrap();
        a.file_name = "renamed.txt".to_string();
        index.upsert(a.clone()).await.unwrap();

        let all = index.read_all().await.unwrap();
        assert_eq!(all, vec![a.clone()]);

        // Survives a fresh instance
        let reopened = index_at(&path, &clock, Arc::default());
        assert_eq!(reopened.read_all().await.unwrap(), vec![a]);
    }

    #[tokio::test]
    async fn test_update_by_id_requires_existing() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let index = index_at(&dir.path().join("index.json"), &clock, Arc::default());

        let result = index.update_by_id("nope", record("nope", &clock, 0)).await;
        assert!(matches!(result, Err(IndexError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_unknown_is_noop() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let index = index_at(&dir.path().join("index.json"), &clock, Arc::default());

        index.upsert(record("a", &clock, 1)).await.unwrap();
        index.upsert(record("b", &clock, 2)).await.unwrap();
        index.remove("missing").await.unwrap();
        index
            .remove_batch(&["b".to_string(), "zzz".to_string()])
            .await
            .unwrap();

        let ids: Vec<_> = index.read_all().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn test_sweep_drops_expired_and_deletes_once() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let path = dir.path().join("index.json");
        let deleter = Arc::new(RecordingDeleter::default());
        let index = index_at(&path, &clock, deleter.clone());

        index.upsert(record("a", &clock, 23)).await.unwrap();
        index.upsert(record("b", &clock, 1)).await.unwrap();

        // "a" crosses its 24h mark, "b" does not
        clock.advance(Duration::hours(2));

        let valid = index.read_all().await.unwrap();
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].id, "b");

        // A second read does not retry the delete
        let second = index.sweep().await.unwrap();
        assert!(second.expired_ids.is_empty());
        index.flush_pending_deletes().await;
        assert_eq!(*deleter.calls.lock().unwrap(), vec!["remote-a".to_string()]);

        // Persisted set holds only "b"
        let reopened = index_at(&path, &clock, Arc::default());
        let ids: Vec<_> = reopened.read_all().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[tokio::test]
    async fn test_remote_failure_does_not_fail_read() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let deleter = Arc::new(RecordingDeleter {
            fail: true,
            ..Default::default()
        });
        let index = index_at(&dir.path().join("index.json"), &clock, deleter.clone());

        index.upsert(record("old", &clock, 30)).await.unwrap();
        let valid = index.read_all().await.unwrap();
        index.flush_pending_deletes().await;

        assert!(valid.is_empty());
        assert_eq!(deleter.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_entries_filtered_and_legacy_backfilled() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let path = dir.path().join("index.json");

        let good = record("good", &clock, 1);
        let contents = serde_json::json!([
            serde_json::to_value(&good).unwrap(),
            { "fileName": "no-id.txt", "uploadTime": "2025-01-01T00:00:00Z", "remoteUrl": "u", "remoteId": "r" },
            {
                "id": "legacy",
                "fileName": "legacy.txt",
                "uploadTime": "2020-01-01T00:00:00Z",
                "url": "https://cdn/legacy",
                "publicId": "legacy"
            }
        ]);
        std::fs::write(&path, contents.to_string()).unwrap();

        let index = index_at(&path, &clock, Arc::default());
        let all = index.read_all().await.unwrap();
        assert_eq!(all.len(), 2);

        let legacy = all.iter().find(|r| r.id == "legacy").unwrap();
        assert_eq!(legacy.expires_at, clock.now() + Duration::hours(24));

        // Cleaned set was written back
        let on_disk: Vec<JsonValue> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 2);
        assert!(on_disk.iter().all(|v| v.get("expiresAt").is_some()));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reset() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let path = dir.path().join("index.json");
        std::fs::write(&path, "{ this is not json").unwrap();

        let index = index_at(&path, &clock, Arc::default());
        assert!(index.read_all().await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[tokio::test]
    async fn test_import_keeps_newer_local_record() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let index = index_at(&dir.path().join("index.json"), &clock, Arc::default());

        let local = record("shared", &clock, 1);
        index.upsert(local.clone()).await.unwrap();

        let mut older = record("shared", &clock, 3);
        older.file_size = 999;
        let fresh = record("fresh", &clock, 0);

        let changed = index.import(&[older, fresh.clone()]).await.unwrap();
        assert_eq!(changed, 1);

        let all = index.read_all().await.unwrap();
        assert_eq!(all, vec![fresh, local]);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_are_not_lost() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let index = Arc::new(index_at(&dir.path().join("index.json"), &clock, Arc::default()));

        let mut handles = Vec::new();
        for i in 0..20 {
            let index = index.clone();
            let rec = record(&format!("r{}", i), &clock, 1);
            handles.push(tokio::spawn(async move { index.upsert(rec).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(index.read_all().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_write_failure_leaves_state_unchanged() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        // A directory where the file should be makes every rename fail
        let path = dir.path().join("index.json");
        let index = index_at(&path, &clock, Arc::default());
        index.upsert(record("a", &clock, 1)).await.unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let result = index.upsert(record("b", &clock, 1)).await;
        assert!(matches!(result, Err(IndexError::StorageFailed(_))));
        assert!(index.get("b").await.unwrap().is_none());
        assert!(index.get("a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_removed_ids_are_not_reimported() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let path = dir.path().join("index.json");
        let index = index_at(&path, &clock, Arc::default());

        let gone = record("gone", &clock, 1);
        index.upsert(gone.clone()).await.unwrap();
        index.remove("gone").await.unwrap();

        assert_eq!(index.import(&[gone.clone()]).await.unwrap(), 0);
        assert!(index.read_all().await.unwrap().is_empty());

        // The removal is remembered across instances
        let reopened = index_at(&path, &clock, Arc::default());
        assert_eq!(reopened.import(&[gone.clone()]).await.unwrap(), 0);
        assert!(reopened.get("gone").await.unwrap().is_none());

        // An explicit upsert brings it back
        reopened.upsert(gone.clone()).await.unwrap();
        assert_eq!(reopened.read_all().await.unwrap(), vec![gone]);
    }

    #[tokio::test]
    async fn test_removed_ids_are_forgotten_after_retention() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let index = index_at(&dir.path().join("index.json"), &clock, Arc::default());

        index.upsert(record("x", &clock, 1)).await.unwrap();
        index.remove("x").await.unwrap();
        clock.advance(Duration::hours(25));

        let reuploaded = record("x", &clock, 0);
        assert_eq!(index.import(&[reuploaded]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_import_skips_expired_records() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let deleter = Arc::new(RecordingDeleter::default());
        let index = index_at(&dir.path().join("index.json"), &clock, deleter.clone());

        let stale = record("stale", &clock, 30);
        assert_eq!(index.import(&[stale]).await.unwrap(), 0);
        assert!(index.read_all().await.unwrap().is_empty());

        index.flush_pending_deletes().await;
        assert!(deleter.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_ids_are_not_reimported() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let deleter = Arc::new(RecordingDeleter::default());
        let index = index_at(&dir.path().join("index.json"), &clock, deleter.clone());

        let mut old = record("old", &clock, 23);
        index.upsert(old.clone()).await.unwrap();
        clock.advance(Duration::hours(2));
        assert!(index.read_all().await.unwrap().is_empty());

        // A snapshot copy with a fresh expiry still stays out
        old.expires_at = clock.now() + Duration::hours(24);
        assert_eq!(index.import(&[old]).await.unwrap(), 0);
        assert!(index.read_all().await.unwrap().is_empty());

        index.flush_pending_deletes().await;
        assert_eq!(deleter.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_sweep_write_deletes_once_and_retries_write() {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let path = dir.path().join("index.json");
        let deleter = Arc::new(RecordingDeleter::default());
        let index = index_at(&path, &clock, deleter.clone());

        index.upsert(record("a", &clock, 23)).await.unwrap();
        index.upsert(record("b", &clock, 1)).await.unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        clock.advance(Duration::hours(2));

        let first = index.sweep().await.unwrap();
        assert_eq!(first.expired_ids, vec!["a".to_string()]);
        let second = index.sweep().await.unwrap();
        assert!(second.expired_ids.is_empty());
        index.flush_pending_deletes().await;
        assert_eq!(deleter.calls.lock().unwrap().len(), 1);

        // Once the path is writable again the swept set lands on disk
        std::fs::remove_dir(&path).unwrap();
        index.read_all().await.unwrap();
        let on_disk: Vec<JsonValue> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0]["id"], "b");
    }
}
