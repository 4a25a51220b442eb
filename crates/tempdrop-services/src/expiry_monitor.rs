use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tempdrop_core::Clock;
use tempdrop_index::{expiring_within, LocalIndex};
use tokio::sync::mpsc;

use crate::scheduler::ScheduledJob;

/// Events emitted by background jobs for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Notification {
    /// A file will expire within the warning window.
    #[serde(rename_all = "camelCase")]
    NearExpiry {
        id: String,
        file_name: String,
        expires_at: DateTime<Utc>,
    },
    /// Files were dropped by the expiry sweep.
    #[serde(rename_all = "camelCase")]
    Expired { ids: Vec<String> },
    /// Records from the shared index were merged in.
    #[serde(rename_all = "camelCase")]
    SyncMerged { count: usize },
}

pub type NotificationSender = mpsc::UnboundedSender<Notification>;

pub(crate) fn notify(tx: &NotificationSender, notification: Notification) {
    if tx.send(notification).is_err() {
        tracing::debug!("Notification receiver dropped");
    }
}

/// Periodic expiry check.
///
/// Each run reads the index, which drives the sweep, and reports expired files
/// and files entering the warning window. A file is warned about once.
pub struct ExpiryMonitor {
    index: Arc<LocalIndex>,
    warning_window: Duration,
    notifications: NotificationSender,
    warned: Mutex<HashSet<String>>,
}

impl ExpiryMonitor {
    pub fn new(
        index: Arc<LocalIndex>,
        warning_window: Duration,
        notifications: NotificationSender,
    ) -> Self {
        Self {
            index,
            warning_window,
            notifications,
            warned: Mutex::new(HashSet::new()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn check(&self) -> anyhow::Result<()> {
        let report = self.index.sweep().await?;
        let now = self.index.clock().now();

        if !report.expired_ids.is_empty() {
            notify(
                &self.notifications,
                Notification::Expired {
                    ids: report.expired_ids.clone(),
                },
            );
        }

        let expiring = expiring_within(&report.valid, now, self.warning_window);

        let mut warned = self.warned.lock().unwrap_or_else(|e| e.into_inner());
        // Forget files that are gone so the set stays bounded
        warned.retain(|id| report.valid.iter().any(|r| &r.id == id));

        for record in expiring {
            if warned.insert(record.id.clone()) {
                tracing::debug!(
                    record_id = %record.id,
                    expires_at = %record.expires_at,
                    "File nearing expiry"
                );
                notify(
                    &self.notifications,
                    Notification::NearExpiry {
                        id: record.id.clone(),
                        file_name: record.file_name.clone(),
                        expires_at: record.expires_at,
                    },
                );
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ScheduledJob for ExpiryMonitor {
    async fn run(&self) -> anyhow::Result<()> {
        self.check().await
    }
}
