use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::constants::DEFAULT_FILE_TYPE;

/// Metadata for one uploaded file.
///
/// Serialized in camelCase with RFC 3339 timestamps; this is the layout of both
/// the local index file and share-link snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub file_name: String,
    pub upload_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub file_size: u64,
    pub remote_url: String,
    pub file_type: String,
    pub remote_id: String,
}

impl FileRecord {
    /// Build a record for a freshly uploaded object. The expiry is fixed here and
    /// never recomputed.
    #[allow(clippy::too_many_arguments)]
    pub fn new_upload(
        id: String,
        file_name: String,
        file_size: u64,
        file_type: String,
        remote_url: String,
        remote_id: String,
        uploaded_at: DateTime<Utc>,
        retention: Duration,
    ) -> Self {
        Self {
            id,
            file_name,
            upload_time: uploaded_at,
            expires_at: uploaded_at + retention,
            file_size,
            remote_url,
            file_type,
            remote_id,
        }
    }

    /// True once `expires_at` is at or before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Time left before expiry, clamped at zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let left = self.expires_at - now;
        if left < Duration::zero() {
            Duration::zero()
        } else {
            left
        }
    }

    /// Rebuild a record from untrusted persisted or imported JSON.
    ///
    /// Returns `None` when a required string field (`id`, `fileName`, `remoteUrl`,
    /// `remoteId`) is missing or empty, or `uploadTime` does not parse. A missing
    /// `expiresAt` is back-filled with `now + retention`.
    pub fn restore(
        value: &JsonValue,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> Option<RestoredRecord> {
        let stored: StoredRecord = serde_json::from_value(value.clone()).ok()?;

        let id = non_empty(stored.id)?;
        let file_name = non_empty(stored.file_name)?;
        let remote_url = non_empty(stored.remote_url)?;
        let remote_id = non_empty(stored.remote_id)?;
        let upload_time = parse_timestamp(stored.upload_time.as_deref()?)?;

        let (expires_at, backfilled) = match stored.expires_at.as_deref() {
            Some(raw) => (parse_timestamp(raw)?, false),
            None => (now + retention, true),
        };

        Some(RestoredRecord {
            record: FileRecord {
                id,
                file_name,
                upload_time,
                expires_at,
                file_size: stored.file_size.unwrap_or(0),
                remote_url,
                file_type: non_empty(stored.file_type)
                    .unwrap_or_else(|| DEFAULT_FILE_TYPE.to_string()),
                remote_id,
            },
            backfilled,
        })
    }
}

/// Result of [`FileRecord::restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredRecord {
    pub record: FileRecord,
    /// The expiry was missing and has been filled in; the caller should persist.
    pub backfilled: bool,
}

/// Lenient on-disk shape. Older indexes used `url` and `publicId`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    id: Option<String>,
    file_name: Option<String>,
    upload_time: Option<String>,
    expires_at: Option<String>,
    file_size: Option<u64>,
    #[serde(alias = "url")]
    remote_url: Option<String>,
    file_type: Option<String>,
    #[serde(alias = "publicId")]
    remote_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn retention() -> Duration {
        Duration::hours(24)
    }

    #[test]
    fn new_upload_sets_expiry_from_retention() {
        let now = Utc::now();
        let record = FileRecord::new_upload(
            "a".to_string(),
            "Q3-Report.pdf".to_string(),
            2000,
            "application/pdf".to_string(),
            "https://cdn.example.com/a.pdf".to_string(),
            "tempdrop/a".to_string(),
            now,
            retention(),
        );
        assert_eq!(record.expires_at - record.upload_time, Duration::hours(24));
        assert!(!record.is_expired(now));
        assert!(record.is_expired(now + Duration::hours(24)));
    }

    #[test]
    fn remaining_is_clamped() {
        let now = Utc::now();
        let record = FileRecord::new_upload(
            "a".into(),
            "x".into(),
            1,
            "text/plain".into(),
            "u".into(),
            "r".into(),
            now - Duration::hours(30),
            retention(),
        );
        assert_eq!(record.remaining(now), Duration::zero());
    }

    #[test]
    fn restore_serialized_record() {
        let now = Utc::now();
        let record = FileRecord::new_upload(
            "id-1".into(),
            "notes.txt".into(),
            12,
            "text/plain".into(),
            "https://cdn/notes.txt".into(),
            "notes".into(),
            now,
            retention(),
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["fileName"], "notes.txt");

        let restored = FileRecord::restore(&value, now, retention()).unwrap();
        assert_eq!(restored.record, record);
        assert!(!restored.backfilled);
    }

    #[test]
    fn restore_backfills_missing_expiry() {
        let now = Utc::now();
        let value = json!({
            "id": "legacy",
            "fileName": "old.png",
            "uploadTime": "2024-01-01T00:00:00Z",
            "fileSize": 10,
            "url": "https://cdn/old.png",
            "publicId": "old",
        });
        let restored = FileRecord::restore(&value, now, retention()).unwrap();
        assert!(restored.backfilled);
        assert_eq!(restored.record.expires_at, now + retention());
        assert_eq!(restored.record.remote_url, "https://cdn/old.png");
        assert_eq!(restored.record.remote_id, "old");
        assert_eq!(restored.record.file_type, DEFAULT_FILE_TYPE);
    }

    #[test]
    fn restore_rejects_missing_required_strings() {
        let now = Utc::now();
        let missing_id = json!({
            "fileName": "x",
            "uploadTime": "2024-01-01T00:00:00Z",
            "remoteUrl": "u",
            "remoteId": "r",
        });
        assert!(FileRecord::restore(&missing_id, now, retention()).is_none());

        let empty_name = json!({
            "id": "a",
            "fileName": "  ",
            "uploadTime": "2024-01-01T00:00:00Z",
            "remoteUrl": "u",
            "remoteId": "r",
        });
        assert!(FileRecord::restore(&empty_name, now, retention()).is_none());

        let numeric_id = json!({
            "id": 7,
            "fileName": "x",
            "uploadTime": "2024-01-01T00:00:00Z",
            "remoteUrl": "u",
            "remoteId": "r",
        });
        assert!(FileRecord::restore(&numeric_id, now, retention()).is_none());

        assert!(FileRecord::restore(&json!("not an object"), now, retention()).is_none());
    }
}
