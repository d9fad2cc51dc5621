//! Background refresh scheduler
//!
//! Runs a job every `period` on a tokio task until stopped. The job is any
//! async closure; the plugin passes one that runs a full refresh cycle.
//!
//! At most one task runs per scheduler. [`RefreshScheduler::start`] stops the
//! previous task and waits for it to exit before spawning the next one, and
//! [`RefreshScheduler::stop`] waits as well, so a stopped scheduler has no
//! timer left behind. A stop signal also interrupts a job in progress.
//!
//! Dropping the scheduler signals the task to stop without waiting for it.

use std::{future::Future, time::Duration};

use tokio::{
    sync::{Mutex, oneshot},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, info};

struct Running {
    period: Duration,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Running {
    async fn shutdown(self) {
        let _ = self.stop.send(());
        let _ = self.task.await;
    }
}

/// Handle for a cancellable periodic job.
#[derive(Default)]
pub struct RefreshScheduler {
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let period = self
            .running
            .try_lock()
            .ok()
            .and_then(|running| running.as_ref().map(|r| r.period));
        f.debug_struct("RefreshScheduler")
            .field("period", &period)
            .finish()
    }
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts running `job` every `period`, the first time one period from now.
    /// A task that is already running is stopped and joined first.
    pub async fn start<F, Fut>(&self, period: Duration, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut running = self.running.lock().await;
        if let Some(previous) = running.take() {
            debug!(period = ?previous.period, "replacing scheduler task");
            previous.shutdown().await;
        }
        let (stop, mut stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    () = sleep(period) => {}
                }
                debug!("scheduled refresh");
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    () = job() => {}
                }
            }
            debug!("scheduler task exited");
        });
        info!(?period, "background refresh started");
        *running = Some(Running { period, stop, task });
    }

    /// Stops the task and waits for it to exit.
    /// Returns false if nothing was running.
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        match running.take() {
            Some(previous) => {
                previous.shutdown().await;
                info!("background refresh stopped");
                true
            }
            None => false,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Period of the running task, if any.
    pub async fn period(&self) -> Option<Duration> {
        self.running.lock().await.as_ref().map(|r| r.period)
    }
}
