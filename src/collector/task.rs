//! Cancellable periodic polling task.

use super::cycle::{Collector, CyclePhase};
use crate::client::DeviceSource;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

impl<S: DeviceSource + ?Sized + 'static> Collector<S> {
    /// Polls every `interval` until `stop` is cancelled.
    ///
    /// The first poll starts immediately. Cancellation is only observed
    /// between cycles; a cycle in flight always runs to completion.
    pub async fn run(mut self, interval: Duration, stop: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = interval.as_secs(),
            "Started collector"
        );

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.collect_once().await;
        }

        self.enter(CyclePhase::Stopping);
        tracing::info!("Collector stopped");
    }

    /// Moves the collector onto its own task.
    pub fn spawn(self, interval: Duration, stop: CancellationToken) -> CollectorHandle {
        let task = tokio::spawn(self.run(interval, stop.clone()));
        CollectorHandle { stop, task }
    }
}

/// Handle to a spawned collector task.
pub struct CollectorHandle {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl CollectorHandle {
    /// Token that stops the collector when cancelled.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Requests a stop and waits up to `timeout` for the current cycle to end.
    ///
    /// Returns false if the task did not finish in time; it is then left to
    /// be torn down with the runtime.
    pub async fn shutdown(self, timeout: Duration) -> bool {
        self.stop.cancel();
        match tokio::time::timeout(timeout, self.task).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Collector task failed");
                false
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = timeout.as_secs(),
                    "Collector did not stop in time, continuing shutdown"
                );
                false
            }
        }
    }
}
