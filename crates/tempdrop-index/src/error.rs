use tempdrop_core::AppError;
use thiserror::Error;

/// Local index errors
#[derive(Debug, Error)]
pub enum IndexError {
    /// Any failure to read or write the index file. The record set on disk is
    /// unchanged when a write fails.
    #[error("Storage failed: {0}")]
    StorageFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for IndexError {
    fn from(err: std::io::Error) -> Self {
        IndexError::StorageFailed(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        IndexError::StorageFailed(format!("Serialization error: {}", err))
    }
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::StorageFailed(msg) => AppError::Storage(msg),
            IndexError::NotFound(id) => AppError::NotFound(format!("File {} not found", id)),
        }
    }
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Share-link decoding errors
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Share token is not valid base64: {0}")]
    InvalidEncoding(String),

    #[error("Share payload is not a file list: {0}")]
    InvalidPayload(String),
}

impl From<ShareError> for AppError {
    fn from(err: ShareError) -> Self {
        AppError::ShareLink(err.to_string())
    }
}
