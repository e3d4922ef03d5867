//! Pluggable transforms applied to a metric before it enters the window.
//!
//! Production monitors use [`IdentityTransform`]. [`SawtoothInjector`] distorts
//! the recorded loss into a repeating ramp so the alerting path can be rehearsed
//! end to end on a healthy run. Transforms only change what the monitor records.

use serde::{Deserialize, Serialize};

/// A transform over `(step, value)` producing the value to record.
pub trait MetricTransform: Send + Sync {
    fn apply(&self, step: u64, value: f64) -> f64;

    fn name(&self) -> &str;
}

/// Records the metric unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl MetricTransform for IdentityTransform {
    fn apply(&self, _step: u64, value: f64) -> f64 {
        value
    }

    fn name(&self) -> &str {
        "identity"
    }
}

/// Multiplies the metric by a sawtooth ramp once `start_step` is passed.
///
/// For `step > start_step` the recorded value is
/// `value * ((step - start_step) % period) / period * amplitude`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SawtoothInjector {
    pub start_step: u64,
    pub period: u64,
    pub amplitude: f64,
}

impl Default for SawtoothInjector {
    fn default() -> Self {
        Self {
            start_step: 500,
            period: 200,
            amplitude: 5.0,
        }
    }
}

impl MetricTransform for SawtoothInjector {
    fn apply(&self, step: u64, value: f64) -> f64 {
        if step <= self.start_step || self.period == 0 {
            return value;
        }
        let phase = ((step - self.start_step) % self.period) as f64 / self.period as f64;
        value * phase * self.amplitude
    }

    fn name(&self) -> &str {
        "sawtooth"
    }
}

/// Serializable transform selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformConfig {
    #[default]
    Identity,
    Sawtooth(SawtoothInjector),
}

impl TransformConfig {
    pub fn build(&self) -> Box<dyn MetricTransform> {
        match self {
            TransformConfig::Identity => Box::new(IdentityTransform),
            TransformConfig::Sawtooth(injector) => Box::new(*injector),
        }
    }
}
