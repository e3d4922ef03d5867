//! # lossguard-core - streaming loss-divergence detection
//!
//! Watches a scalar training loss for a sustained upward breakout from its
//! recent range and raises rate-limited alerts for a human operator.
//!
//! The pipeline, leaf first:
//! - [`window::SampleWindow`] keeps the most recent `(step, value)` samples.
//! - [`classifier::DivergenceClassifier`] decides whether a full window diverges.
//! - [`gate::AlertGate`] rate-limits evaluation and alerting on wall-clock time.
//! - [`monitor::DivergenceMonitor`] ingests one sample per training step.
//!
//! [`task::MonitorTask`] runs a monitor in a background task that owns it
//! and delivers alerts to an [`sink::AlertSink`].

pub mod alert;
pub mod classifier;
pub mod config;
pub mod error;
pub mod gate;
pub mod monitor;
pub mod sink;
pub mod task;
pub mod transform;
pub mod window;

pub use alert::{AlertNotification, AlertRecord, AlertSeverity};
pub use classifier::{
    Classification, DivergenceClassifier, DivergenceStatus, Thresholds, ols_slope,
};
pub use config::{MonitorConfig, config_exists, load_config, write_default_config};
pub use error::{ConfigError, MonitorError, SinkError};
pub use gate::AlertGate;
pub use monitor::{DivergenceMonitor, Metric, StepInput};
pub use sink::{AlertSink, LogSink, MemorySink, SinkConfig, WebhookSink};
pub use task::{MonitorHandle, MonitorSummary, MonitorTask};
pub use transform::{IdentityTransform, MetricTransform, SawtoothInjector, TransformConfig};
pub use window::{Sample, SampleWindow, WindowSnapshot};
