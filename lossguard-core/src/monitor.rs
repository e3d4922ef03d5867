//! Divergence monitor: ingests one loss sample per training step.
//!
//! Every scalar sample from the primary worker is recorded in the window.
//! The classifier is consulted only while the alert gate is open, and the
//! gate closes only when an alert is emitted. Until the window fills, the
//! classifier reports insufficient data and nothing is emitted.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::alert::AlertRecord;
use crate::classifier::{Classification, DivergenceClassifier};
use crate::config::MonitorConfig;
use crate::error::{ConfigError, MonitorError};
use crate::gate::AlertGate;
use crate::transform::MetricTransform;
use crate::window::SampleWindow;

/// Loss value reported by the training loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Scalar(f64),
    /// Several losses reported together; not supported.
    Composite(Vec<f64>),
}

impl Metric {
    pub fn kind(&self) -> &'static str {
        match self {
            Metric::Scalar(_) => "scalar",
            Metric::Composite(_) => "composite",
        }
    }

    pub fn as_scalar(&self) -> Result<f64, MonitorError> {
        match self {
            Metric::Scalar(v) => Ok(*v),
            Metric::Composite(_) => Err(MonitorError::UnsupportedMetricKind {
                kind: self.kind().to_string(),
            }),
        }
    }
}

impl From<f64> for Metric {
    fn from(value: f64) -> Self {
        Metric::Scalar(value)
    }
}

/// One call from the training loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInput {
    pub step: u64,
    pub loss: Metric,
    /// Wall-clock seconds, consistent across calls.
    pub wallclock_secs: f64,
    pub run_id: String,
    pub is_primary_worker: bool,
}

impl StepInput {
    /// A scalar sample from the primary worker.
    pub fn scalar(step: u64, loss: f64, wallclock_secs: f64, run_id: impl Into<String>) -> Self {
        Self {
            step,
            loss: Metric::Scalar(loss),
            wallclock_secs,
            run_id: run_id.into(),
            is_primary_worker: true,
        }
    }

    pub fn with_primary(mut self, is_primary_worker: bool) -> Self {
        self.is_primary_worker = is_primary_worker;
        self
    }
}

/// Orchestrates window, classifier and gate for a single training run.
pub struct DivergenceMonitor {
    config: MonitorConfig,
    window: SampleWindow,
    classifier: DivergenceClassifier,
    gate: AlertGate,
    transform: Box<dyn MetricTransform>,
    run_id: String,
    samples_seen: u64,
    alerts_fired: u64,
}

impl DivergenceMonitor {
    pub fn new(config: MonitorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let window = SampleWindow::new(config.window_size)?;
        let transform = config.transform.build();
        if transform.name() != "identity" {
            warn!(
                transform = transform.name(),
                "Metric transform active; recorded loss is distorted"
            );
        }
        Ok(Self {
            classifier: DivergenceClassifier::new(config.thresholds()),
            gate: AlertGate::new(config.alert_interval_secs as f64),
            window,
            transform,
            run_id: String::from("unnamed-run"),
            samples_seen: 0,
            alerts_fired: 0,
            config,
        })
    }

    /// Replace the metric transform.
    pub fn with_transform(mut self, transform: Box<dyn MetricTransform>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Record a scalar sample and, when the gate is open, evaluate it.
    pub fn sample(&mut self, step: u64, loss: f64, now: f64) -> Option<AlertRecord> {
        let recorded = self.transform.apply(step, loss);
        self.window.push(step, recorded);
        self.samples_seen += 1;

        if !self.gate.should_evaluate(now) {
            return None;
        }

        let result = self.classifier.check(&self.window);
        debug!(
            step,
            status = result.message(),
            positives = result.positive_count,
            slope = ?result.slope,
            "Divergence check"
        );

        let fire = result.is_divergent()
            || (self.config.report_ok && result.reportable_message().is_some());
        if !fire {
            return None;
        }

        let record = self.build_record(step, &result);
        self.gate.record(now);
        self.alerts_fired += 1;
        if record.is_divergent {
            warn!(step, run_id = %record.run_id, "Loss divergence detected");
        } else {
            info!(step, run_id = %record.run_id, status = %record.message, "Loss status");
        }
        Some(record)
    }

    /// Ingestion boundary for training-loop calls.
    ///
    /// Calls from non-primary workers are ignored. Composite losses are
    /// rejected before any state changes.
    pub fn observe(&mut self, input: &StepInput) -> Result<Option<AlertRecord>, MonitorError> {
        if !self.accepts(input) {
            return Ok(None);
        }
        self.ingest(input)
    }

    /// Whether `input` comes from the worker this monitor listens to.
    /// Only the primary worker's samples are monitored.
    pub fn accepts(&self, input: &StepInput) -> bool {
        input.is_primary_worker
    }

    /// Record an accepted sample. Callers check [`accepts`](Self::accepts) first.
    pub(crate) fn ingest(
        &mut self,
        input: &StepInput,
    ) -> Result<Option<AlertRecord>, MonitorError> {
        let loss = input.loss.as_scalar()?;
        if self.run_id != input.run_id {
            self.run_id.clone_from(&input.run_id);
        }
        Ok(self.sample(input.step, loss, input.wallclock_secs))
    }

    /// Like [`observe`](Self::observe), but logs and skips the step on error
    /// so monitoring never interrupts training.
    pub fn observe_or_skip(&mut self, input: &StepInput) -> Option<AlertRecord> {
        match self.observe(input) {
            Ok(record) => record,
            Err(e) => {
                warn!(step = input.step, error = %e, "Skipping divergence monitoring for step");
                None
            }
        }
    }

    fn build_record(&self, step: u64, result: &Classification) -> AlertRecord {
        AlertRecord {
            message: result.message().to_string(),
            is_divergent: result.is_divergent(),
            run_id: self.run_id.clone(),
            node_rank: self.config.node_rank,
            node_name: self.config.node_name.clone(),
            step,
            timestamp: Utc::now(),
        }
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn gate(&self) -> &AlertGate {
        &self.gate
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    pub fn alerts_fired(&self) -> u64 {
        self.alerts_fired
    }
}
