//! Error types module
//!
//! All user-facing failures are unified under `AppError`. Crate-local errors
//! (storage, index, share link) convert into it at the service boundary.

use std::io;
use std::time::Duration;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like bad user input
    Debug,
    /// Warning level - for remote failures that leave local state usable
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Describes how an error should be presented to the user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "UPLOAD_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether repeating the same action may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from the internal error message)
    fn user_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Upload timed out after {0:?}")]
    Timeout(Duration),

    #[error("Delete failed: {0}")]
    Delete(String),

    #[error("Storage failed: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Invalid share link: {0}")]
    ShareLink(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata per variant: (error_code, recoverable, suggested_action, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppError::Configuration(_) => (
            "CONFIGURATION_ERROR",
            false,
            Some("Set TEMPDROP_CLOUD_NAME and TEMPDROP_API_KEY, then retry"),
            LogLevel::Error,
        ),
        AppError::Upload(_) => (
            "UPLOAD_FAILED",
            true,
            Some("Check your connection and upload the file again"),
            LogLevel::Warn,
        ),
        AppError::Timeout(_) => (
            "UPLOAD_TIMEOUT",
            true,
            Some("Retry on a faster connection or with a smaller file"),
            LogLevel::Warn,
        ),
        AppError::Delete(_) => (
            "DELETE_FAILED",
            true,
            Some("Retry the delete after a short delay"),
            LogLevel::Warn,
        ),
        AppError::Storage(_) => (
            "STORAGE_FAILED",
            true,
            Some("Check free disk space and index file permissions"),
            LogLevel::Error,
        ),
        AppError::NotFound(_) => (
            "NOT_FOUND",
            false,
            Some("Verify the file ID with `tempdrop list`"),
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            "INVALID_INPUT",
            false,
            Some("Check command arguments and try again"),
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge { .. } => (
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size or raise TEMPDROP_MAX_FILE_SIZE_MB"),
            LogLevel::Debug,
        ),
        AppError::ShareLink(_) => (
            "INVALID_SHARE_LINK",
            false,
            Some("Ask the sender for a fresh share link"),
            LogLevel::Debug,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn user_message(&self) -> String {
        match self {
            AppError::Configuration(ref msg) => msg.clone(),
            AppError::Upload(ref msg) => format!("Upload failed: {}", msg),
            AppError::Timeout(limit) => format!("Upload timed out after {:?}", limit),
            AppError::Delete(ref msg) => format!("Delete failed: {}", msg),
            AppError::Storage(_) => "Storage failed".to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::PayloadTooLarge { size, limit } => {
                format!("File is {} bytes; the limit is {} bytes", size, limit)
            }
            AppError::ShareLink(ref msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal error".to_string()
            }
        }
    }
}
