pub mod batch;
pub mod file_record;
pub mod filter;

pub use batch::{BatchDeleteResult, BatchItemError};
pub use file_record::{FileRecord, RestoredRecord};
pub use filter::{FilterSpec, SortField, SortOrder};
