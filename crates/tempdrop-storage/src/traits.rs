//! Remote store abstraction traits

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempdrop_core::AppError;
use thiserror::Error;

/// Remote store operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Upload timed out after {0:?}")]
    Timeout(Duration),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// The provider reports the object is already absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UploadFailed(msg) | StorageError::DownloadFailed(msg) => {
                AppError::Upload(msg)
            }
            StorageError::Timeout(limit) => AppError::Timeout(limit),
            StorageError::DeleteFailed(msg) => AppError::Delete(msg),
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::ConfigError(msg) => AppError::Configuration(msg),
        }
    }
}

/// Result type for remote store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Receives the fraction of the upload body sent so far, in `0.0..=1.0`.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// What the provider returned for a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    /// Permanent fetch URL
    pub remote_url: String,
    /// Opaque identifier required for deletion
    pub remote_id: String,
    /// Byte size as stored by the provider
    pub bytes: u64,
}

/// What a successful delete actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The object was removed from the remote store.
    Removed,
    /// Nothing was sent to the provider; the object may still exist remotely.
    LocalOnly,
}

/// Upload side of the hosted media store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a blob and return its permanent URL and identifier.
    ///
    /// Fails with `UploadFailed` on a non-success status or network error and with
    /// `Timeout` when the configured upper bound elapses.
    async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
        progress: Option<ProgressCallback>,
    ) -> StorageResult<UploadedObject>;

    /// Fetch the bytes behind a permanent URL.
    async fn fetch(&self, remote_url: &str) -> StorageResult<Vec<u8>>;

    /// Provider name for logs
    fn provider_name(&self) -> &'static str;
}

/// Delete side of the hosted media store.
///
/// A successful return only implies the object is gone when the outcome is
/// [`DeleteOutcome::Removed`].
#[async_trait]
pub trait RemoteDeleter: Send + Sync {
    async fn delete(&self, remote_id: &str, file_type: &str) -> StorageResult<DeleteOutcome>;

    /// Whether this deleter contacts the provider at all.
    fn removes_remotely(&self) -> bool;
}
