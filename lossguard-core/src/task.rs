//! Single-owner background monitor task.
//!
//! Runs as a `tokio::spawn` task that exclusively owns a [`DivergenceMonitor`].
//! Samples arrive over a bounded queue in submission order and fired alerts
//! are delivered to the sink from inside the task, so the monitor needs no
//! locking and the training loop never waits on alert delivery.

use crate::error::MonitorError;
use crate::monitor::{DivergenceMonitor, StepInput};
use crate::sink::AlertSink;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Counters reported when the task shuts down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSummary {
    /// Samples recorded in the window.
    pub samples_seen: u64,
    /// Samples from non-primary workers.
    pub samples_ignored: u64,
    /// Samples rejected at the ingestion boundary.
    pub samples_skipped: u64,
    pub alerts_fired: u64,
    pub deliveries_failed: u64,
}

/// Spawns monitor tasks.
pub struct MonitorTask;

impl MonitorTask {
    /// Move `monitor` into a background task fed by a queue of
    /// `queue_capacity` samples.
    pub fn spawn(
        monitor: DivergenceMonitor,
        sink: Arc<dyn AlertSink>,
        queue_capacity: usize,
    ) -> MonitorHandle {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        info!(
            run_id = monitor.run_id(),
            window_size = monitor.config().window_size,
            sink = sink.name(),
            "Divergence monitor started"
        );
        let handle = tokio::spawn(monitor_loop(monitor, sink, rx));
        MonitorHandle { tx, handle }
    }
}

/// Producer side of a running monitor task.
pub struct MonitorHandle {
    tx: mpsc::Sender<StepInput>,
    handle: JoinHandle<MonitorSummary>,
}

impl MonitorHandle {
    /// Queue a sample, waiting for capacity if the queue is full.
    pub async fn submit(&self, input: StepInput) -> Result<(), MonitorError> {
        self.tx.send(input).await.map_err(|_| MonitorError::Closed)
    }

    /// Queue a sample without waiting. A full queue drops the sample.
    pub fn try_submit(&self, input: StepInput) -> Result<(), MonitorError> {
        self.tx.try_send(input).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => MonitorError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => MonitorError::Closed,
        })
    }

    /// Close the queue, let the task drain it, and return its counters.
    pub async fn shutdown(self) -> Result<MonitorSummary, MonitorError> {
        drop(self.tx);
        self.handle.await.map_err(|e| {
            warn!(error = %e, "Divergence monitor task did not finish cleanly");
            MonitorError::Closed
        })
    }
}

async fn monitor_loop(
    mut monitor: DivergenceMonitor,
    sink: Arc<dyn AlertSink>,
    mut rx: mpsc::Receiver<StepInput>,
) -> MonitorSummary {
    let dedup_window = monitor.config().alert_interval_secs;
    let mut summary = MonitorSummary::default();

    while let Some(input) = rx.recv().await {
        if !monitor.accepts(&input) {
            summary.samples_ignored += 1;
            continue;
        }
        let record = match monitor.ingest(&input) {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(e) => {
                summary.samples_skipped += 1;
                warn!(step = input.step, error = %e, "Skipping divergence monitoring for step");
                continue;
            }
        };

        summary.alerts_fired += 1;
        let notification = record.to_notification(dedup_window);
        match sink.deliver(&notification).await {
            Ok(()) => debug!(sink = sink.name(), step = record.step, "Alert delivered"),
            Err(e) => {
                summary.deliveries_failed += 1;
                warn!(sink = sink.name(), error = %e, "Alert delivery failed");
            }
        }
    }

    summary.samples_seen = monitor.samples_seen();
    info!(
        samples = summary.samples_seen,
        alerts = summary.alerts_fired,
        "Divergence monitor stopped"
    );
    summary
}
