use serde::{Deserialize, Serialize};

/// Failure of one item inside a batch delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemError {
    pub id: String,
    pub message: String,
}

/// Aggregate outcome of a batch delete. Item order inside `errors` is not
/// meaningful; only the counts are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteResult {
    pub success_count: usize,
    pub failed_count: usize,
    pub errors: Vec<BatchItemError>,
}

impl BatchDeleteResult {
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, id: impl Into<String>, message: impl Into<String>) {
        self.failed_count += 1;
        self.errors.push(BatchItemError {
            id: id.into(),
            message: message.into(),
        });
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed_count == 0
    }
}
