//! Search and ordering for the displayed list.

use std::cmp::Ordering;
use tempdrop_core::{FileRecord, FilterSpec, SortField, SortOrder};

/// Produce the display list for `spec`.
///
/// The search term matches case-insensitively as a substring of `file_name`; an
/// empty term matches everything. Names compare case-insensitively, times and
/// sizes numerically. The sort is stable, so equal keys keep input order.
pub fn apply_filter(records: &[FileRecord], spec: &FilterSpec) -> Vec<FileRecord> {
    let term = spec.search_term.trim().to_lowercase();

    let mut result: Vec<FileRecord> = records
        .iter()
        .filter(|r| term.is_empty() || r.file_name.to_lowercase().contains(&term))
        .cloned()
        .collect();

    result.sort_by(|a, b| {
        let ordering = compare(a, b, spec.sort_by);
        match spec.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    result
}

fn compare(a: &FileRecord, b: &FileRecord, field: SortField) -> Ordering {
    match field {
        SortField::Name => a.file_name.to_lowercase().cmp(&b.file_name.to_lowercase()),
        SortField::UploadTime => a.upload_time.cmp(&b.upload_time),
        SortField::Size => a.file_size.cmp(&b.file_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::collections::HashSet;

    fn record(id: &str, name: &str, minutes_ago: i64, size: u64) -> FileRecord {
        let uploaded = Utc::now() - Duration::minutes(minutes_ago);
        FileRecord {
            id: id.to_string(),
            file_name: name.to_string(),
            upload_time: uploaded,
            expires_at: uploaded + Duration::hours(24),
            file_size: size,
            remote_url: format!("https://cdn/{}", id),
            file_type: "application/pdf".to_string(),
            remote_id: id.to_string(),
        }
    }

    fn sample() -> Vec<FileRecord> {
        vec![
            record("1", "Q3-Report.pdf", 10, 2000),
            record("2", "holiday.jpg", 20, 500),
            record("3", "annual REPORT final.docx", 5, 12_000),
            record("4", "notes.txt", 1, 42),
        ]
    }

    fn ids(records: &[FileRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn empty_search_keeps_membership() {
        let records = sample();
        let filtered = apply_filter(&records, &FilterSpec::default());
        let before: HashSet<_> = ids(&records).into_iter().collect();
        let after: HashSet<_> = ids(&filtered).into_iter().collect();
        assert_eq!(before, after);
        // Default order is newest first
        assert_eq!(ids(&filtered), vec!["4", "3", "1", "2"]);
    }

    #[test]
    fn search_is_case_insensitive_on_name_only() {
        let filtered = apply_filter(&sample(), &FilterSpec::search("report"));
        let mut found = ids(&filtered);
        found.sort();
        assert_eq!(found, vec!["1", "3"]);

        // URLs and ids do not match
        assert!(apply_filter(&sample(), &FilterSpec::search("cdn")).is_empty());
    }

    #[test]
    fn size_ascending_is_reverse_of_descending() {
        let records = sample();
        let asc = apply_filter(&records, &FilterSpec::sorted(SortField::Size, SortOrder::Asc));
        let mut desc =
            apply_filter(&records, &FilterSpec::sorted(SortField::Size, SortOrder::Desc));
        desc.reverse();
        assert_eq!(asc, desc);
        assert_eq!(ids(&asc), vec!["4", "2", "1", "3"]);
    }

    #[test]
    fn name_sort_ignores_case() {
        let sorted = apply_filter(&sample(), &FilterSpec::sorted(SortField::Name, SortOrder::Asc));
        assert_eq!(ids(&sorted), vec!["3", "2", "4", "1"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let records = vec![
            record("a", "same", 1, 10),
            record("b", "same", 2, 10),
            record("c", "same", 3, 10),
        ];
        let sorted = apply_filter(&records, &FilterSpec::sorted(SortField::Size, SortOrder::Asc));
        assert_eq!(ids(&sorted), vec!["a", "b", "c"]);
    }
}
