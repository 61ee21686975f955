//! Self-rescheduling background task
//!
//! Each iteration waits for the previous tick to finish and then sleeps for
//! the configured delay, so the observed period is `delay + tick duration`.
//! `stop()` interrupts either the running tick or the sleep.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct PeriodicTask {
    name: &'static str,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn `tick` on the current runtime. The first tick runs immediately.
    pub fn spawn<F, Fut>(name: &'static str, delay: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            debug!("{} started (delay {:?})", name, delay);
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = tick() => {}
                }
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            debug!("{} stopped", name);
        });

        Self {
            name,
            stop_tx,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the loop to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                debug!("{} panicked: {}", self.name, e);
            }
        }
    }
}
