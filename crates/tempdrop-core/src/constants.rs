//! Shared constants.

/// Retention window applied to every uploaded file.
pub const RETENTION_HOURS: i64 = 24;

/// Upper bound on a single upload, in seconds.
pub const UPLOAD_TIMEOUT_SECS: u64 = 300;

/// Fan-out used when deleting many remote objects.
pub const BATCH_DELETE_CONCURRENCY: usize = 5;

/// MIME type assumed when a persisted record or upload carries none.
pub const DEFAULT_FILE_TYPE: &str = "application/octet-stream";
