//! Property-based tests for core components using proptest.

use proptest::prelude::*;

use lossguard_core::classifier::{DivergenceClassifier, DivergenceStatus, Thresholds};
use lossguard_core::config::MonitorConfig;
use lossguard_core::gate::AlertGate;
use lossguard_core::monitor::DivergenceMonitor;
use lossguard_core::window::SampleWindow;

fn thresholds(window_size: usize) -> Thresholds {
    Thresholds {
        window_size,
        ..Thresholds::default()
    }
}

// --- Sample window properties ---

proptest! {
    #[test]
    fn window_never_exceeds_capacity(
        capacity in 1usize..64,
        values in prop::collection::vec(-1e6f64..1e6, 0..300),
    ) {
        let mut window = SampleWindow::new(capacity).unwrap();
        for (step, value) in values.iter().enumerate() {
            window.push(step as u64, *value);
            prop_assert!(window.len() <= capacity);
        }
    }

    #[test]
    fn window_retains_most_recent_in_order(
        capacity in 1usize..64,
        values in prop::collection::vec(-1e6f64..1e6, 0..300),
    ) {
        let mut window = SampleWindow::new(capacity).unwrap();
        for (step, value) in values.iter().enumerate() {
            window.push(step as u64, *value);
        }
        let keep = values.len().min(capacity);
        let expected: Vec<f64> = values[values.len() - keep..].to_vec();
        let retained: Vec<f64> = window.snapshot().values().collect();
        prop_assert_eq!(retained, expected);

        let first_kept = (values.len() - keep) as u64;
        let expected_steps: Vec<u64> = (first_kept..values.len() as u64).collect();
        let retained_steps: Vec<u64> = window.snapshot().steps().collect();
        prop_assert_eq!(retained_steps, expected_steps);
    }
}

// --- Classifier properties ---

proptest! {
    #[test]
    fn classifier_is_pure(
        values in prop::collection::vec(0.0f64..100.0, 2..80),
    ) {
        let mut window = SampleWindow::new(values.len()).unwrap();
        for (step, value) in values.iter().enumerate() {
            window.push(step as u64, *value);
        }
        let classifier = DivergenceClassifier::new(thresholds(values.len()));
        prop_assert_eq!(classifier.check(&window), classifier.check(&window));
    }

    #[test]
    fn identical_values_never_diverge(
        value in -1e9f64..1e9,
        window_size in 1usize..120,
    ) {
        let mut window = SampleWindow::new(window_size).unwrap();
        for step in 0..window_size {
            window.push(step as u64, value);
        }
        let result = DivergenceClassifier::new(thresholds(window_size)).check(&window);
        prop_assert_eq!(result.status, DivergenceStatus::NoDivergence);
    }

    #[test]
    fn partial_window_never_classified(
        window_size in 2usize..120,
        values in prop::collection::vec(-1e3f64..1e3, 1..120),
    ) {
        let mut window = SampleWindow::new(window_size).unwrap();
        for (step, value) in values.iter().take(window_size - 1).enumerate() {
            window.push(step as u64, *value);
        }
        let result = DivergenceClassifier::new(thresholds(window_size)).check(&window);
        prop_assert_eq!(result.status, DivergenceStatus::InsufficientData);
        prop_assert!(result.reportable_message().is_none());
    }

    #[test]
    fn non_increasing_span_never_diverges(
        values in prop::collection::vec(0.0f64..100.0, 3..60),
    ) {
        let mut values = values;
        // Force the last sample at or below the first.
        let first = values[0];
        let last = values.len() - 1;
        values[last] = first - (values[last] % 1.0);

        let mut window = SampleWindow::new(values.len()).unwrap();
        for (step, value) in values.iter().enumerate() {
            window.push(step as u64, *value);
        }
        let result = DivergenceClassifier::new(thresholds(values.len())).check(&window);
        prop_assert!(!result.is_divergent());
    }
}

// --- Gate and monitor properties ---

proptest! {
    #[test]
    fn gate_closed_strictly_inside_interval(
        interval in 1u32..10_000,
        fired_at in 0u32..1_000_000,
        offset_fraction in 0.0f64..1.0,
    ) {
        let interval = interval as f64;
        let fired_at = fired_at as f64;
        let mut gate = AlertGate::new(interval);
        gate.record(fired_at);
        let probe = fired_at + offset_fraction * interval;
        prop_assert!(probe - fired_at >= interval || !gate.should_evaluate(probe));
        prop_assert!(gate.should_evaluate(fired_at + interval));
    }

    #[test]
    fn alerts_respect_interval(
        interval in 10u64..1_000,
        growth in prop::collection::vec(0.5f64..5.0, 20..200),
        dt in 0.1f64..50.0,
    ) {
        let config = MonitorConfig {
            window_size: 5,
            alert_interval_secs: interval,
            ..MonitorConfig::default()
        };
        let mut monitor = DivergenceMonitor::new(config).unwrap();
        let mut loss = 1.0;
        let mut fired_at: Vec<f64> = Vec::new();
        for (i, g) in growth.iter().enumerate() {
            loss += g;
            let now = i as f64 * dt;
            if monitor.sample(i as u64, loss, now).is_some() {
                fired_at.push(now);
            }
        }
        for pair in fired_at.windows(2) {
            prop_assert!(pair[1] - pair[0] >= interval as f64);
        }
    }
}
