use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;

/// Number of samples a statistic is computed over
pub const WINDOW_CAPACITY: usize = 5;

/// Mean and population standard deviation of a full window, in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStatistics {
    pub mean: f64,
    pub std_dev: f64,
}

/// The most recent distance samples, oldest first
#[derive(Debug, Clone, Default)]
pub struct MeasurementWindow {
    samples: VecDeque<f64>,
}

impl MeasurementWindow {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW_CAPACITY + 1),
        }
    }

    /// Append a sample, evicting the oldest once the window is full
    pub fn push(&mut self, sample_mm: f64) {
        self.samples.push_back(sample_mm);
        while self.samples.len() > WINDOW_CAPACITY {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == WINDOW_CAPACITY
    }

    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// Statistics over the current contents, `None` until the window is full
    pub fn statistics(&self) -> Option<WindowStatistics> {
        if !self.is_full() {
            return None;
        }

        let n = self.samples.len() as f64;
        let (sum, sum_sq) = self
            .samples
            .iter()
            .fold((0.0, 0.0), |(sum, sum_sq), x| (sum + x, sum_sq + x * x));

        let mean = sum / n;
        // E[x^2] - E[x]^2 can dip just below zero for near-constant input
        let variance = (sum_sq / n - mean * mean).max(0.0);

        Some(WindowStatistics {
            mean,
            std_dev: variance.sqrt(),
        })
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Turns a stream of raw distance samples into windowed statistics
#[derive(Debug, Clone, Default)]
pub struct MeasurementFilter {
    window: MeasurementWindow,
}

impl MeasurementFilter {
    pub fn new() -> Self {
        Self {
            window: MeasurementWindow::new(),
        }
    }

    /// Add a sample; returns statistics once five samples have been seen
    pub fn ingest(&mut self, sample_mm: f64) -> Option<WindowStatistics> {
        self.window.push(sample_mm);

        let stats = self.window.statistics();
        match &stats {
            Some(s) => trace!(
                "Window {:?}: mean={:.3} stddev={:.3}",
                self.window.samples.iter().collect::<Vec<_>>(),
                s.mean,
                s.std_dev
            ),
            None => trace!(
                "Insufficient data ({}/{} samples)",
                self.window.len(),
                WINDOW_CAPACITY
            ),
        }
        stats
    }

    pub fn window(&self) -> &MeasurementWindow {
        &self.window
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}
