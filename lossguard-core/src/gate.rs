//! Wall-clock alert gate.
//!
//! The same interval governs how often the classifier is consulted and how
//! often an alert can fire: the monitor only evaluates while the gate is open,
//! and the gate only closes when an alert is actually emitted.

/// Rate limiter keyed on wall-clock seconds.
#[derive(Debug, Clone)]
pub struct AlertGate {
    interval_secs: f64,
    last_alert_time: f64,
}

impl AlertGate {
    /// Create a gate that is open immediately.
    pub fn new(interval_secs: f64) -> Self {
        Self {
            interval_secs,
            last_alert_time: -interval_secs,
        }
    }

    /// Whether enough time has passed since the last alert.
    pub fn should_evaluate(&self, now: f64) -> bool {
        now - self.last_alert_time >= self.interval_secs
    }

    /// Close the gate until `now + interval_secs`. Call only after an alert
    /// was actually emitted.
    pub fn record(&mut self, now: f64) {
        self.last_alert_time = now;
    }

    /// Seconds until the gate reopens, zero when open.
    pub fn remaining(&self, now: f64) -> f64 {
        (self.interval_secs - (now - self.last_alert_time)).max(0.0)
    }

    pub fn last_alert_time(&self) -> f64 {
        self.last_alert_time
    }

    pub fn interval_secs(&self) -> f64 {
        self.interval_secs
    }
}
