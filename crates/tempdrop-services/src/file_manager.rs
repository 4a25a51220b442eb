use chrono::Duration;
use futures::future::join_all;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempdrop_core::constants::DEFAULT_FILE_TYPE;
use tempdrop_core::{
    AppError, BatchDeleteResult, Clock, Config, FileRecord, FilterSpec, RemovalPolicy, SystemClock,
};
use tempdrop_index::share::{build_share_url, decode_snapshot, extract_token};
use tempdrop_index::{apply_filter, expiring_within, LocalIndex};
use tempdrop_storage::{
    batch_delete_detailed, create_deleter, create_object_store, summarize, DeleteOutcome,
    DeleteTarget, ObjectStore, ProgressCallback, RemoteDeleter, StorageResult,
};
use uuid::Uuid;

/// Result of deleting one file.
#[derive(Debug)]
pub struct DeletionReport {
    pub id: String,
    /// Whether the record is gone from the local index.
    pub removed_locally: bool,
    /// What the remote store said. A not-found error counts as removed.
    pub remote: StorageResult<DeleteOutcome>,
}

impl DeletionReport {
    pub fn remote_succeeded(&self) -> bool {
        match &self.remote {
            Ok(_) => true,
            Err(e) => e.is_not_found(),
        }
    }
}

/// User-facing file operations over the remote store and the local index.
pub struct FileManager {
    config: Config,
    index: Arc<LocalIndex>,
    store: Arc<dyn ObjectStore>,
    deleter: Arc<dyn RemoteDeleter>,
    clock: Arc<dyn Clock>,
}

impl FileManager {
    pub fn new(
        config: Config,
        index: Arc<LocalIndex>,
        store: Arc<dyn ObjectStore>,
        deleter: Arc<dyn RemoteDeleter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            index,
            store,
            deleter,
            clock,
        }
    }

    /// Wire up the provider clients and the index from configuration.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        config.validate()?;

        let store = create_object_store(&config)?;
        let deleter = create_deleter(&config)?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let index = Arc::new(LocalIndex::new(
            config.index_path.clone(),
            clock.clone(),
            deleter.clone(),
            config.retention(),
        ));

        tracing::info!(
            provider = store.provider_name(),
            delete_mode = %config.delete_mode,
            removal_policy = %config.removal_policy,
            index_path = %config.index_path.display(),
            "File manager initialized"
        );

        Ok(Self::new(config, index, store, deleter, clock))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &Arc<LocalIndex> {
        &self.index
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn provider_name(&self) -> &'static str {
        self.store.provider_name()
    }

    /// False when deletes only touch the local index.
    pub fn removes_remotely(&self) -> bool {
        self.deleter.removes_remotely()
    }

    /// Upload in-memory content and record it in the index.
    ///
    /// The content type falls back to a guess from the file name, then to
    /// `application/octet-stream`.
    #[tracing::instrument(skip(self, data, progress), fields(size_bytes = data.len()))]
    pub async fn upload_bytes(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        data: Vec<u8>,
        progress: Option<ProgressCallback>,
    ) -> Result<FileRecord, AppError> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(AppError::InvalidInput("File name must not be empty".to_string()));
        }

        let size = data.len() as u64;
        let limit = self.config.max_file_size_bytes;
        if size > limit {
            return Err(AppError::PayloadTooLarge { size, limit });
        }

        let file_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .map(String::from)
            .unwrap_or_else(|| guess_content_type(file_name));

        let uploaded = self
            .store
            .upload(file_name, &file_type, data, progress)
            .await?;

        let record = FileRecord::new_upload(
            Uuid::new_v4().to_string(),
            file_name.to_string(),
            size,
            file_type,
            uploaded.remote_url,
            uploaded.remote_id,
            self.clock.now(),
            self.config.retention(),
        );

        self.index.upsert(record.clone()).await?;

        tracing::info!(
            record_id = %record.id,
            file_name = %record.file_name,
            size_bytes = record.file_size,
            expires_at = %record.expires_at,
            "File uploaded"
        );

        Ok(record)
    }

    /// Read a file from disk and upload it under its own name.
    pub async fn upload_file(
        &self,
        path: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<FileRecord, AppError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                AppError::InvalidInput(format!("Not a file path: {}", path.display()))
            })?;

        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            AppError::InvalidInput(format!("Cannot read {}: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(AppError::InvalidInput(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }
        // Reject before reading the whole thing into memory
        let limit = self.config.max_file_size_bytes;
        if metadata.len() > limit {
            return Err(AppError::PayloadTooLarge {
                size: metadata.len(),
                limit,
            });
        }

        let data = tokio::fs::read(path).await.map_err(|e| {
            AppError::InvalidInput(format!("Cannot read {}: {}", path.display(), e))
        })?;

        self.upload_bytes(file_name, None, data, progress).await
    }

    /// Upload several files concurrently. Each file gets its own result; one
    /// failure does not stop the others.
    pub async fn upload_many(
        &self,
        paths: &[PathBuf],
    ) -> Vec<(PathBuf, Result<FileRecord, AppError>)> {
        let results = join_all(paths.iter().map(|path| self.upload_file(path, None))).await;
        paths.iter().cloned().zip(results).collect()
    }

    /// Current files after the expiry sweep, filtered and ordered for display.
    pub async fn list(&self, filter: &FilterSpec) -> Result<Vec<FileRecord>, AppError> {
        let records = self.index.read_all().await?;
        Ok(apply_filter(&records, filter))
    }

    /// Reload the index from disk, picking up changes made by other processes.
    pub async fn refresh(&self) -> Result<Vec<FileRecord>, AppError> {
        self.index.reload().await;
        Ok(self.index.read_all().await?)
    }

    pub async fn get(&self, id: &str) -> Result<FileRecord, AppError> {
        self.index
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))
    }

    /// Fetch a file's content from the remote store.
    pub async fn download(&self, id: &str) -> Result<(FileRecord, Vec<u8>), AppError> {
        let record = self.get(id).await?;
        let data = self.store.fetch(&record.remote_url).await?;
        Ok((record, data))
    }

    /// Delete one file, remotely and from the index.
    ///
    /// With [`RemovalPolicy::Unconditional`] the record is always removed locally;
    /// with [`RemovalPolicy::AfterRemote`] it stays when the remote delete fails.
    #[tracing::instrument(skip(self), fields(record_id = %id))]
    pub async fn delete_file(&self, id: &str) -> Result<DeletionReport, AppError> {
        let record = self.get(id).await?;

        let remote = self
            .deleter
            .delete(&record.remote_id, &record.file_type)
            .await;

        let mut report = DeletionReport {
            id: record.id,
            removed_locally: false,
            remote,
        };

        if let Err(ref e) = report.remote {
            if !e.is_not_found() {
                tracing::warn!(error = %e, "Remote delete failed");
            }
        }

        if self.should_remove_locally(report.remote_succeeded()) {
            self.index.remove(&report.id).await?;
            report.removed_locally = true;
        }

        Ok(report)
    }

    /// Delete several files with bounded concurrency.
    ///
    /// Repeated ids count once. Ids missing from the index are reported as
    /// failures. Local removal follows the configured [`RemovalPolicy`], as for
    /// [`FileManager::delete_file`].
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_batch(&self, ids: &[String]) -> Result<BatchDeleteResult, AppError> {
        let mut targets = Vec::with_capacity(ids.len());
        let mut unknown = Vec::new();
        for id in unique(ids) {
            match self.index.get(id).await? {
                Some(record) => targets.push(DeleteTarget {
                    id: record.id,
                    remote_id: record.remote_id,
                    file_type: record.file_type,
                }),
                None => unknown.push(id.to_string()),
            }
        }

        let outcomes =
            batch_delete_detailed(self.deleter.as_ref(), &targets, self.config.batch_concurrency)
                .await;

        let to_remove: Vec<String> = outcomes
            .iter()
            .filter(|o| self.should_remove_locally(o.succeeded()))
            .map(|o| o.id.clone())
            .collect();
        self.index.remove_batch(&to_remove).await?;

        let mut summary = summarize(&outcomes);
        for id in unknown {
            let message = format!("File {} not found", id);
            summary.record_failure(id, message);
        }

        tracing::info!(
            success_count = summary.success_count,
            failed_count = summary.failed_count,
            removed_locally = to_remove.len(),
            "Batch delete completed"
        );

        Ok(summary)
    }

    fn should_remove_locally(&self, remote_succeeded: bool) -> bool {
        match self.config.removal_policy {
            RemovalPolicy::Unconditional => true,
            RemovalPolicy::AfterRemote => remote_succeeded,
        }
    }

    /// Build a share link for the given ids, or for every current file when `ids`
    /// is empty.
    pub async fn share_link(
        &self,
        ids: &[String],
        base_url: Option<&str>,
    ) -> Result<String, AppError> {
        let records = self.index.read_all().await?;
        let selected: Vec<FileRecord> = if ids.is_empty() {
            records
        } else {
            let wanted = unique(ids);
            let missing: Vec<&str> = wanted
                .iter()
                .copied()
                .filter(|id| !records.iter().any(|r| r.id == *id))
                .collect();
            if !missing.is_empty() {
                return Err(AppError::NotFound(format!(
                    "Files not found: {}",
                    missing.join(", ")
                )));
            }
            records
                .into_iter()
                .filter(|r| wanted.contains(&r.id.as_str()))
                .collect()
        };

        let base_url = base_url.unwrap_or(self.config.share_base_url.as_str());
        Ok(build_share_url(base_url, &selected)?)
    }

    /// Merge the records carried by a share link (or bare token) into the index.
    ///
    /// Returns how many records were added or replaced.
    #[tracing::instrument(skip(self, url_or_token))]
    pub async fn import_share_link(&self, url_or_token: &str) -> Result<usize, AppError> {
        let token = extract_token(url_or_token);
        if token.is_empty() {
            return Err(AppError::ShareLink("Share link carries no data".to_string()));
        }

        let records = decode_snapshot(token, self.clock.now(), self.config.retention())?;
        let merged = self.index.import(&records).await?;

        tracing::info!(received = records.len(), merged, "Share link imported");
        Ok(merged)
    }

    /// Current files expiring within `window`, soonest first.
    pub async fn near_expiry(&self, window: Duration) -> Result<Vec<FileRecord>, AppError> {
        let records = self.index.read_all().await?;
        let mut expiring: Vec<FileRecord> = expiring_within(&records, self.clock.now(), window)
            .into_iter()
            .cloned()
            .collect();
        expiring.sort_by_key(|r| r.expires_at);
        Ok(expiring)
    }
}

/// Ids in first-seen order, each once.
fn unique(ids: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(String::as_str)
        .filter(|id| seen.insert(*id))
        .collect()
}

fn guess_content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_FILE_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("Q3-Report.pdf"), "application/pdf");
        assert_eq!(guess_content_type("photo.PNG"), "image/png");
        assert_eq!(guess_content_type("no-extension"), DEFAULT_FILE_TYPE);
    }

    #[test]
    fn test_unique_keeps_first_occurrence() {
        let ids: Vec<String> = ["b", "a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(unique(&ids), vec!["b", "a", "c"]);
    }
}
