//! Alert records produced by the monitor and the notifications built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity attached to an outgoing notification. Divergence and status
/// alerts are both sent at warning level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "warning"),
        }
    }
}

/// An alert emitted by the monitor. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Classifier status message.
    pub message: String,
    pub is_divergent: bool,
    pub run_id: String,
    pub node_rank: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Training step that triggered the evaluation.
    pub step: u64,
    pub timestamp: DateTime<Utc>,
}

impl AlertRecord {
    /// `[timestamp][run_id][node_rank=N]`, plus `[node=NAME]` when known.
    ///
    /// The timestamp is rendered in UTC, not the host's local time zone.
    pub fn title(&self) -> String {
        let mut title = format!(
            "[{}][{}][node_rank={}]",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.6f"),
            self.run_id,
            self.node_rank
        );
        if let Some(ref node) = self.node_name {
            title.push_str(&format!("[node={node}]"));
        }
        title
    }

    /// Build the outgoing notification. `dedup_window_secs` is the sink-side
    /// de-duplication hint, normally the alert interval.
    pub fn to_notification(&self, dedup_window_secs: u64) -> AlertNotification {
        AlertNotification {
            title: self.title(),
            body: self.message.clone(),
            severity: AlertSeverity::Warning,
            wait_duration_secs: dedup_window_secs,
            run_id: self.run_id.clone(),
            step: self.step,
            is_divergent: self.is_divergent,
        }
    }
}

/// Payload handed to an [`crate::sink::AlertSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertNotification {
    pub title: String,
    pub body: String,
    pub severity: AlertSeverity,
    /// Suggested de-duplication window for the receiving service.
    pub wait_duration_secs: u64,
    pub run_id: String,
    pub step: u64,
    pub is_divergent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn record(node_name: Option<&str>) -> AlertRecord {
        AlertRecord {
            message: "Divergence detected".into(),
            is_divergent: true,
            run_id: "llama-7b-run3".into(),
            node_rank: 0,
            node_name: node_name.map(String::from),
            step: 1200,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_title_without_node_name() {
        assert_eq!(
            record(None).title(),
            "[2025-03-01 12:30:00.000000][llama-7b-run3][node_rank=0]"
        );
    }

    #[test]
    fn test_title_with_node_name() {
        assert_eq!(
            record(Some("gpu-node-17")).title(),
            "[2025-03-01 12:30:00.000000][llama-7b-run3][node_rank=0][node=gpu-node-17]"
        );
    }

    #[test]
    fn test_notification_is_warning_with_dedup_window() {
        let notification = record(None).to_notification(300);
        assert_eq!(notification.severity, AlertSeverity::Warning);
        assert_eq!(notification.body, "Divergence detected");
        assert_eq!(notification.wait_duration_secs, 300);
        assert_eq!(notification.step, 1200);
    }

    #[test]
    fn test_notification_serializes_lowercase_severity() {
        let json = serde_json::to_value(record(None).to_notification(60)).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["wait_duration_secs"], 60);
    }

    #[test]
    fn test_title_uses_utc_timestamp() {
        let local = chrono::FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 1, 21, 30, 0)
            .unwrap();
        let record = AlertRecord {
            timestamp: local.with_timezone(&Utc),
            ..record(None)
        };
        assert!(record.title().starts_with("[2025-03-01 12:30:00.000000]"));
        assert_eq!(AlertSeverity::Warning.to_string(), "warning");
    }
}
