use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Work run on a fixed period.
///
/// Jobs must be idempotent; a run may overlap with user commands touching the
/// same index.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn run(&self) -> anyhow::Result<()>;
}

/// A job running on its own task until stopped.
///
/// The first run happens immediately, then once per period. A failed run is
/// logged and the schedule continues.
pub struct PeriodicTask {
    name: String,
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    pub fn start(
        name: impl Into<String>,
        period: Duration,
        job: Arc<dyn ScheduledJob>,
    ) -> Self {
        let name = name.into();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            Self::worker_loop(task_name, period, job, shutdown_rx).await;
        });

        Self {
            name,
            shutdown_tx,
            handle,
        }
    }

    async fn worker_loop(
        name: String,
        period: Duration,
        job: Arc<dyn ScheduledJob>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(task = %name, period_secs = period.as_secs_f64(), "Scheduled task started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = job.run().await {
                        tracing::error!(task = %name, error = %e, "Scheduled task run failed");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!(task = %name, "Scheduled task shutting down");
                    break;
                }
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signal the task and wait for it to finish. A run in progress completes
    /// first.
    pub async fn stop(self) {
        if let Err(e) = self.shutdown_tx.send(()).await {
            tracing::warn!(task = %self.name, error = %e, "Failed to send shutdown signal");
        }
        if let Err(e) = self.handle.await {
            tracing::warn!(task = %self.name, error = %e, "Scheduled task ended abnormally");
        }
    }
}

/// Owns a set of periodic tasks and stops them together.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<PeriodicTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, name: impl Into<String>, period: Duration, job: Arc<dyn ScheduledJob>) {
        self.tasks.push(PeriodicTask::start(name, period, job));
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(PeriodicTask::name).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Stop every task, waiting for each to finish.
    pub async fn stop(self) {
        for task in self.tasks {
            task.stop().await;
        }
    }
}
