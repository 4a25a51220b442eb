use crate::traits::{DeleteOutcome, RemoteDeleter, StorageResult};
use futures::future::join_all;
use tempdrop_core::BatchDeleteResult;

/// One object to delete, keyed by the local record id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTarget {
    pub id: String,
    pub remote_id: String,
    pub file_type: String,
}

/// Per-item result of a batch delete.
#[derive(Debug)]
pub struct ItemOutcome {
    pub id: String,
    pub result: StorageResult<DeleteOutcome>,
}

impl ItemOutcome {
    /// The object is absent from the remote store or was never sent there.
    /// A provider "not found" counts as success.
    pub fn succeeded(&self) -> bool {
        match &self.result {
            Ok(_) => true,
            Err(e) => e.is_not_found(),
        }
    }
}

/// Delete every target, `concurrency` at a time.
///
/// Groups run one after another; items inside a group run concurrently, so the
/// order of outcomes within a group is not meaningful. A failure never aborts the
/// batch.
pub async fn batch_delete_detailed(
    deleter: &dyn RemoteDeleter,
    targets: &[DeleteTarget],
    concurrency: usize,
) -> Vec<ItemOutcome> {
    let mut outcomes = Vec::with_capacity(targets.len());

    for group in targets.chunks(concurrency.max(1)) {
        let results = join_all(group.iter().map(|target| async move {
            ItemOutcome {
                id: target.id.clone(),
                result: deleter.delete(&target.remote_id, &target.file_type).await,
            }
        }))
        .await;

        for outcome in &results {
            if let Err(ref e) = outcome.result {
                if e.is_not_found() {
                    tracing::debug!(record_id = %outcome.id, "Remote object already absent");
                } else {
                    tracing::warn!(record_id = %outcome.id, error = %e, "Remote delete failed");
                }
            }
        }

        outcomes.extend(results);
    }

    outcomes
}

/// Delete every target and aggregate the counts.
pub async fn batch_delete(
    deleter: &dyn RemoteDeleter,
    targets: &[DeleteTarget],
    concurrency: usize,
) -> BatchDeleteResult {
    summarize(&batch_delete_detailed(deleter, targets, concurrency).await)
}

/// Fold per-item outcomes into counts and per-id errors.
pub fn summarize(outcomes: &[ItemOutcome]) -> BatchDeleteResult {
    let mut summary = BatchDeleteResult::default();
    for outcome in outcomes {
        if outcome.succeeded() {
            summary.record_success();
        } else if let Err(ref e) = outcome.result {
            summary.record_failure(outcome.id.clone(), e.to_string());
        }
    }
    summary
}
