//! Tempdrop Core Library
//!
//! This crate provides the domain models, error types, configuration and clock
//! abstraction shared by every Tempdrop component.

pub mod clock;
pub mod config;
pub mod constants;
pub mod delete_mode;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use delete_mode::{DeleteMode, RemovalPolicy};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    BatchDeleteResult, BatchItemError, FileRecord, FilterSpec, SortField, SortOrder,
};
