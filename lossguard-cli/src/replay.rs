//! Replay of recorded metric streams.
//!
//! Each input line is a JSON object such as
//! `{"step": 120, "loss": 2.31, "wallclock_secs": 845.2, "rank": 0}`.
//! `loss` may also be an array, which the monitor rejects as a composite
//! metric. Lines from ranks other than 0 are treated as non-primary workers.

use anyhow::Context;
use lossguard_core::{
    AlertSink, DivergenceMonitor, Metric, MonitorConfig, MonitorSummary, MonitorTask, StepInput,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::ReplayArgs;

const QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Deserialize)]
struct MetricLine {
    step: u64,
    loss: Metric,
    wallclock_secs: f64,
    #[serde(default)]
    rank: u32,
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub lines_read: u64,
    pub lines_malformed: u64,
    #[serde(flatten)]
    pub summary: MonitorSummary,
}

pub(crate) fn parse_line(line: &str, run_id: &str) -> Result<StepInput, serde_json::Error> {
    let parsed: MetricLine = serde_json::from_str(line)?;
    Ok(StepInput {
        step: parsed.step,
        loss: parsed.loss,
        wallclock_secs: parsed.wallclock_secs,
        run_id: run_id.to_string(),
        is_primary_worker: parsed.rank == 0,
    })
}

/// Load layered configuration and apply command-line overrides.
pub(crate) fn resolve_config(
    args: &ReplayArgs,
    workspace: &Path,
) -> anyhow::Result<MonitorConfig> {
    let mut config = lossguard_core::load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    if let Some(window_size) = args.window_size {
        config.window_size = window_size;
    }
    if let Some(interval) = args.interval {
        config.alert_interval_secs = interval;
    }
    if args.report_ok {
        config.report_ok = true;
    }
    if config.node_name.is_none() {
        config.node_name = std::env::var("NODENAME").ok().filter(|n| !n.is_empty());
    }
    config.validate()?;
    Ok(config)
}

/// Stream `path` through a background monitor that delivers to `sink`.
pub(crate) async fn replay_file(
    path: &Path,
    run_id: &str,
    config: MonitorConfig,
    sink: Arc<dyn AlertSink>,
) -> anyhow::Result<ReplayReport> {
    let monitor = DivergenceMonitor::new(config)?.with_run_id(run_id);
    let handle = MonitorTask::spawn(monitor, sink, QUEUE_CAPACITY);

    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    let mut lines_read = 0u64;
    let mut lines_malformed = 0u64;
    while let Some(line) = lines.next_line().await? {
        lines_read += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line, run_id) {
            Ok(input) => handle.submit(input).await?,
            Err(e) => {
                lines_malformed += 1;
                warn!(line = lines_read, error = %e, "Skipping malformed metric line");
            }
        }
    }

    let summary = handle.shutdown().await?;
    Ok(ReplayReport {
        lines_read,
        lines_malformed,
        summary,
    })
}

pub(crate) async fn run(args: ReplayArgs, workspace: &Path) -> anyhow::Result<()> {
    let config = resolve_config(&args, workspace)?;
    let sink: Arc<dyn AlertSink> = Arc::from(config.sink.build());
    let report = replay_file(&args.input, &args.run_id, config, sink).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Replayed {} lines from {}",
            report.lines_read,
            args.input.display()
        );
        println!("  samples monitored: {}", report.summary.samples_seen);
        println!("  non-primary:       {}", report.summary.samples_ignored);
        println!("  skipped:           {}", report.summary.samples_skipped);
        println!("  malformed:         {}", report.lines_malformed);
        println!("  alerts fired:      {}", report.summary.alerts_fired);
        if report.summary.deliveries_failed > 0 {
            println!("  delivery failures: {}", report.summary.deliveries_failed);
        }
    }
    Ok(())
}
