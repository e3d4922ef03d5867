//! Divergence classification over a full sample window.
//!
//! A window is classified as divergent when the loss ends higher than it
//! started, enough samples break out above both the magnitude floor and the
//! starting level (normalized to the window's range), and a least-squares
//! line through the normalized samples rises faster than the slope floor.
//!
//! The magnitude/frequency pass is a cheap pre-filter: noisy but flat windows
//! are rejected before a regression is fitted.

use crate::window::SampleWindow;
use serde::{Deserialize, Serialize};

/// Detection thresholds, fixed for the lifetime of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Number of samples a window must hold before it is classified.
    pub window_size: usize,
    /// Fraction of the window that must be positive excursions.
    pub frequency_threshold: f64,
    /// Normalized excursion floor.
    pub magnitude_threshold: f64,
    /// Normalized regression slope floor.
    pub slope_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            window_size: 100,
            frequency_threshold: 0.6,
            magnitude_threshold: 0.05,
            slope_threshold: 0.1,
        }
    }
}

/// Outcome category of a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceStatus {
    /// The window is not full yet.
    InsufficientData,
    NoDivergence,
    Divergent,
}

impl DivergenceStatus {
    pub fn message(&self) -> &'static str {
        match self {
            DivergenceStatus::InsufficientData => "no status",
            DivergenceStatus::NoDivergence => "No divergence",
            DivergenceStatus::Divergent => "Divergence detected",
        }
    }
}

/// Result of [`DivergenceClassifier::check`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub status: DivergenceStatus,
    /// Positive excursions counted, zero when the count was never reached.
    pub positive_count: usize,
    /// Fitted slope, present only when the trend test ran.
    pub slope: Option<f64>,
}

impl Classification {
    fn insufficient() -> Self {
        Self {
            status: DivergenceStatus::InsufficientData,
            positive_count: 0,
            slope: None,
        }
    }

    fn no_divergence(positive_count: usize, slope: Option<f64>) -> Self {
        Self {
            status: DivergenceStatus::NoDivergence,
            positive_count,
            slope,
        }
    }

    pub fn message(&self) -> &'static str {
        self.status.message()
    }

    pub fn is_divergent(&self) -> bool {
        self.status == DivergenceStatus::Divergent
    }

    /// The message worth reporting, if any. Insufficient data has none.
    pub fn reportable_message(&self) -> Option<&'static str> {
        match self.status {
            DivergenceStatus::InsufficientData => None,
            _ => Some(self.message()),
        }
    }
}

/// Stateless divergence classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct DivergenceClassifier {
    thresholds: Thresholds,
}

impl DivergenceClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Classify the current window contents. Pure: the same window always
    /// yields the same result.
    pub fn check(&self, window: &SampleWindow) -> Classification {
        if !window.is_full() {
            return Classification::insufficient();
        }
        let snap = window.snapshot();
        let (first, last) = match (snap.first(), snap.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Classification::insufficient(),
        };

        let (min_loss, max_loss) = min_max(snap.values());
        let loss_range = max_loss - min_loss;

        // Flat or improving over the window span.
        if last.value - first.value <= 0.0 {
            return Classification::no_divergence(0, None);
        }
        // Zero or non-finite range cannot be normalized.
        if !(loss_range > 0.0 && loss_range.is_finite()) {
            return Classification::no_divergence(0, None);
        }

        let norm = |v: f64| (v - min_loss) / loss_range;
        let norm_first = norm(first.value);
        let positive_count = snap
            .values()
            .skip(1)
            .map(norm)
            .filter(|&n| n > self.thresholds.magnitude_threshold && n > norm_first)
            .count();

        let required = self.thresholds.window_size as f64 * self.thresholds.frequency_threshold;
        if (positive_count as f64) < required {
            return Classification::no_divergence(positive_count, None);
        }

        let (min_step, max_step) = min_max(snap.steps().map(|s| s as f64));
        let step_range = max_step - min_step;
        if step_range <= 0.0 {
            return Classification::no_divergence(positive_count, None);
        }
        let xs: Vec<f64> = snap
            .steps()
            .map(|s| (s as f64 - min_step) / step_range)
            .collect();
        let ys: Vec<f64> = snap.values().map(norm).collect();

        match ols_slope(&xs, &ys) {
            Some(slope) if slope > self.thresholds.slope_threshold => Classification {
                status: DivergenceStatus::Divergent,
                positive_count,
                slope: Some(slope),
            },
            slope => Classification::no_divergence(positive_count, slope),
        }
    }
}

/// Ordinary least-squares slope `b` of `y = a + b * x`.
///
/// Returns `None` for mismatched lengths, fewer than two points, or when all
/// `x` values coincide.
pub fn ols_slope(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }

    if sxx == 0.0 { None } else { Some(sxy / sxx) }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}
