//! Fixed-capacity sample window with strict FIFO eviction.
//!
//! The window retains the most recent `capacity` samples in arrival order.
//! Pushing into a full window evicts the oldest sample before appending.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A single observation of the monitored metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub step: u64,
    pub value: f64,
}

impl Sample {
    pub fn new(step: u64, value: f64) -> Self {
        Self { step, value }
    }
}

/// Bounded, ordered buffer of the most recent samples.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleWindow {
    /// Create an empty window. A capacity of zero is rejected.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::invalid("window_size", "must be at least 1"));
        }
        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append a sample, evicting the oldest one when the window is full.
    pub fn push(&mut self, step: u64, value: f64) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample::new(step, value));
    }

    /// Read-only view of the current contents.
    pub fn snapshot(&self) -> WindowSnapshot<'_> {
        WindowSnapshot {
            samples: &self.samples,
        }
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate samples oldest first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Sample> + '_ {
        self.samples.iter()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Borrowed view over a [`SampleWindow`]; cannot mutate the window.
#[derive(Debug, Clone, Copy)]
pub struct WindowSnapshot<'a> {
    samples: &'a VecDeque<Sample>,
}

impl<'a> WindowSnapshot<'a> {
    pub fn steps(self) -> impl ExactSizeIterator<Item = u64> + 'a {
        self.samples.iter().map(|s| s.step)
    }

    pub fn values(self) -> impl ExactSizeIterator<Item = f64> + 'a {
        self.samples.iter().map(|s| s.value)
    }

    pub fn first(&self) -> Option<&'a Sample> {
        self.samples.front()
    }

    pub fn last(&self) -> Option<&'a Sample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Copy the contents out, oldest first.
    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }
}
