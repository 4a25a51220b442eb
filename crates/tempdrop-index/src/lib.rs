//! Tempdrop Index Library
//!
//! The local file index and the pure routines around it:
//!
//! - [`LocalIndex`]: durable record set; every read runs the expiry sweep.
//! - [`merge`]: reconcile two record lists by id, latest upload wins.
//! - [`apply_filter`]: search and ordering for display.
//! - [`share`]: encode and decode share-link snapshots.
//!
//! Every merged or displayed list is ordered by upload time, newest first, unless
//! a filter asks otherwise.

pub mod error;
pub mod filter;
pub mod local;
pub mod reconcile;
pub mod share;
pub mod sweep;

// Re-export commonly used types
pub use error::{IndexError, IndexResult, ShareError};
pub use filter::apply_filter;
pub use local::{LocalIndex, SweepReport};
pub use reconcile::merge;
pub use sweep::{expiring_within, partition_expired};
