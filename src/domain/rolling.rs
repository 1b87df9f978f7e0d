//! Fixed-capacity sliding window over the most recent observations.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            values: VecDeque::new(),
        }
    }

    /// Push a value, evicting the oldest once capacity is exceeded.
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        if self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    pub fn is_full(&self) -> bool {
        self.values.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> + '_ {
        self.values.iter()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Population variance (divides by the window length).
    pub fn population_variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        self.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / self.values.len() as f64
    }
}

/// Z-score of `value` against a mean and population variance.
///
/// Non-positive variance gives a zero deviation, and a zero deviation gives a
/// zero score.
pub fn z_score(value: f64, mean: f64, variance: f64) -> f64 {
    let stdev = if variance > 0.0 { variance.sqrt() } else { 0.0 };
    if stdev > 0.0 {
        (value - mean) / stdev
    } else {
        0.0
    }
}
