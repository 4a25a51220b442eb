//! Tempdrop Services Layer
//!
//! Orchestration on top of the storage clients and the local index:
//! [`FileManager`] for user commands, and the scheduled jobs
//! ([`ExpiryMonitor`], [`SyncJob`]) run by a [`Scheduler`]. Everything goes
//! through one [`tempdrop_index::LocalIndex`], so jobs and commands can run
//! concurrently.

pub mod expiry_monitor;
pub mod file_manager;
pub mod scheduler;
pub mod sync;

pub use expiry_monitor::{ExpiryMonitor, Notification, NotificationSender};
pub use file_manager::{DeletionReport, FileManager};
pub use scheduler::{PeriodicTask, ScheduledJob, Scheduler};
pub use sync::{FileSharedIndex, SharedIndexSource, SyncJob};
pub use tempdrop_index::LocalIndex;
pub use tempdrop_storage::{DeleteOutcome, ProgressCallback};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Start the background jobs enabled in the configuration.
///
/// Returns the running scheduler and the stream of notifications they emit.
pub fn start_background_jobs(
    manager: &FileManager,
) -> (Scheduler, mpsc::UnboundedReceiver<Notification>) {
    let config = manager.config();
    let (tx, rx) = mpsc::unbounded_channel();
    let mut scheduler = Scheduler::new();

    let monitor = ExpiryMonitor::new(
        manager.index().clone(),
        config.near_expiry_window(),
        tx.clone(),
    );
    scheduler.start(
        "expiry-monitor",
        Duration::from_secs(config.sweep_interval_secs.max(1)),
        Arc::new(monitor),
    );

    if config.sync_enabled {
        let source = Arc::new(FileSharedIndex::new(config.sync_path.clone()));
        let job = SyncJob::new(manager.index().clone(), source, tx);
        scheduler.start(
            "shared-index-sync",
            Duration::from_secs(config.sync_interval_secs.max(1)),
            Arc::new(job),
        );
    }

    (scheduler, rx)
}
