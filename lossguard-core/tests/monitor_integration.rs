//! Integration tests for the divergence monitor.
//!
//! These drive whole training runs through the monitor and the background
//! task, checking which alerts reach the sink.

use lossguard_core::config::MonitorConfig;
use lossguard_core::monitor::{DivergenceMonitor, StepInput};
use lossguard_core::sink::MemorySink;
use lossguard_core::task::MonitorTask;
use lossguard_core::transform::{SawtoothInjector, TransformConfig};
use std::sync::Arc;

/// Smoothly decaying loss of a healthy run.
fn healthy_loss(step: u64) -> f64 {
    2.0 * (-(step as f64) / 1000.0).exp() + 0.5
}

#[test]
fn test_flat_then_ramp_scenario() {
    let config = MonitorConfig {
        window_size: 5,
        frequency_threshold: 0.6,
        magnitude_threshold: 0.05,
        slope_threshold: 0.1,
        alert_interval_secs: 300,
        report_ok: true,
        ..MonitorConfig::default()
    };
    let mut monitor = DivergenceMonitor::new(config).unwrap().with_run_id("ramp");

    let mut alerts = Vec::new();
    // One alert interval between evaluations so every full window is classified.
    for (i, loss) in [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 10.0]
        .into_iter()
        .enumerate()
    {
        let step = i as u64 + 1;
        if let Some(record) = monitor.sample(step, loss, step as f64 * 300.0) {
            alerts.push((step, record.message, record.is_divergent));
        }
    }

    assert_eq!(alerts[0], (5, "No divergence".to_string(), false));
    let (last_step, last_message, last_divergent) = alerts.last().cloned().unwrap();
    assert_eq!(last_step, 10);
    assert_eq!(last_message, "Divergence detected");
    assert!(last_divergent);
}

#[test]
fn test_healthy_run_never_alerts() {
    let mut monitor = DivergenceMonitor::new(MonitorConfig::default()).unwrap();
    for step in 1..=3000 {
        assert!(monitor.sample(step, healthy_loss(step), step as f64).is_none());
    }
    assert_eq!(monitor.alerts_fired(), 0);
}

#[tokio::test]
async fn test_injected_sawtooth_reaches_sink() {
    let config = MonitorConfig {
        transform: TransformConfig::Sawtooth(SawtoothInjector::default()),
        ..MonitorConfig::default()
    };
    let sink = Arc::new(MemorySink::new());
    let handle = MonitorTask::spawn(DivergenceMonitor::new(config).unwrap(), sink.clone(), 64);

    for step in 1..=1500u64 {
        handle
            .submit(StepInput::scalar(step, healthy_loss(step), step as f64, "sawtooth-drill"))
            .await
            .unwrap();
    }
    let summary = handle.shutdown().await.unwrap();

    let delivered = sink.notifications();
    assert!(!delivered.is_empty());
    assert!(delivered.iter().all(|n| n.is_divergent));
    assert!(delivered[0].step > 500);
    assert_eq!(summary.alerts_fired as usize, delivered.len());
    // One step per second, 300 s interval.
    for pair in delivered.windows(2) {
        assert!(pair[1].step - pair[0].step >= 300);
    }
}

#[tokio::test]
async fn test_only_primary_worker_drives_monitor() {
    let config = MonitorConfig {
        window_size: 5,
        ..MonitorConfig::default()
    };
    let sink = Arc::new(MemorySink::new());
    let handle = MonitorTask::spawn(DivergenceMonitor::new(config).unwrap(), sink.clone(), 64);

    let losses = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 10.0];
    for (i, loss) in losses.into_iter().enumerate() {
        let step = i as u64 + 1;
        for rank in 0..4u32 {
            // Other ranks report wildly different values; they must not count.
            let reported = if rank == 0 { loss } else { 1000.0 - loss };
            let input = StepInput::scalar(step, reported, step as f64, "ddp");
            handle.submit(input.with_primary(rank == 0)).await.unwrap();
        }
    }
    let summary = handle.shutdown().await.unwrap();

    assert_eq!(summary.samples_seen, 10);
    assert_eq!(summary.samples_ignored, 30);
    assert_eq!(sink.len(), 1);
}
