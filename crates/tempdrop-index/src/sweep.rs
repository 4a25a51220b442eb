//! Expiry partitioning.
//!
//! The sweep itself runs inside [`crate::LocalIndex::read_all`]; these helpers
//! hold the time comparison so it can be tested without a file.

use chrono::{DateTime, Duration, Utc};
use tempdrop_core::FileRecord;

/// Split records into `(valid, expired)`. A record whose `expires_at` is at or
/// before `now` is expired. Relative order is kept on both sides.
pub fn partition_expired(
    records: Vec<FileRecord>,
    now: DateTime<Utc>,
) -> (Vec<FileRecord>, Vec<FileRecord>) {
    records.into_iter().partition(|r| !r.is_expired(now))
}

/// Valid records that expire within `window` from `now`.
pub fn expiring_within<'a>(
    records: &'a [FileRecord],
    now: DateTime<Utc>,
    window: Duration,
) -> Vec<&'a FileRecord> {
    records
        .iter()
        .filter(|r| !r.is_expired(now) && r.expires_at <= now + window)
        .collect()
}
