//! Error types for the lossguard core library.
//!
//! Uses `thiserror` for public API error types. Classifier outcomes such as
//! insufficient data or a degenerate window range are not errors and never
//! appear here; they resolve to a [`crate::classifier::Classification`].

/// Errors from configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to load configuration: {message}")]
    Load { message: String },

    #[error("Failed to write configuration: {message}")]
    Write { message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised at the monitor ingestion boundary.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Unsupported metric kind: {kind} (only scalar losses can be monitored)")]
    UnsupportedMetricKind { kind: String },

    #[error("Monitor queue is full, sample dropped")]
    QueueFull,

    #[error("Monitor task has shut down")]
    Closed,
}

/// Errors from alert delivery.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Sink '{sink}' failed to deliver alert: {message}")]
    DeliveryFailed { sink: String, message: String },

    #[error("Failed to serialize alert: {0}")]
    Serialization(#[from] serde_json::Error),
}
