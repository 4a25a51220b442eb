//! Index reconciliation.

use std::collections::HashMap;
use tempdrop_core::FileRecord;

/// Combine two record lists into one, deduplicated by `id`.
///
/// Records from `first` are taken in order, then records from `second`. When an id
/// is already present the incoming record replaces it only if its `upload_time` is
/// strictly later, so on an exact tie the earlier-seen record (from `first`) stays.
/// The output is ordered by `upload_time`, newest first; the sort is stable.
pub fn merge(first: &[FileRecord], second: &[FileRecord]) -> Vec<FileRecord> {
    let mut merged: Vec<FileRecord> = Vec::with_capacity(first.len() + second.len());
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for record in first.iter().chain(second.iter()) {
        match positions.get(record.id.as_str()) {
            Some(&pos) => {
                if record.upload_time > merged[pos].upload_time {
                    merged[pos] = record.clone();
                }
            }
            None => {
                positions.insert(record.id.as_str(), merged.len());
                merged.push(record.clone());
            }
        }
    }

    sort_newest_first(&mut merged);
    merged
}

/// Global display and persistence order.
pub fn sort_newest_first(records: &mut [FileRecord]) {
    records.sort_by(|a, b| b.upload_time.cmp(&a.upload_time));
}
