//! Timing utilities
//!
//! Tracks how long interactions and their phases take.

use crate::utils::clock::Clock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Tracks timing metrics over a sliding window
#[derive(Debug, Clone)]
pub struct TimingTracker {
    samples: VecDeque<Duration>,
    max_samples: usize,
}

impl TimingTracker {
    /// Create a new timing tracker with the specified window size
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    /// Record a new timing sample
    pub fn record(&mut self, duration: Duration) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
    }

    /// Get the average duration
    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.samples.iter().sum();
        total / self.samples.len() as u32
    }

    /// Get the maximum duration
    pub fn max(&self) -> Duration {
        self.samples.iter().max().copied().unwrap_or(Duration::ZERO)
    }

    /// Get the number of samples
    pub fn count(&self) -> usize {
        self.samples.len()
    }
}

impl Default for TimingTracker {
    fn default() -> Self {
        Self::new(32)
    }
}

/// One labelled phase duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseSplit {
    pub phase: String,
    pub millis: u64,
}

/// Stopwatch over an injected clock, recording one split per phase
pub struct PhaseTimer {
    clock: Arc<dyn Clock>,
    start: Duration,
    last: Duration,
    splits: Vec<PhaseSplit>,
}

impl PhaseTimer {
    /// Start a new timer at the clock's current reading
    pub fn start(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            clock,
            start: now,
            last: now,
            splits: Vec::new(),
        }
    }

    /// Close the running phase under `label` and start the next one
    pub fn split(&mut self, label: impl Into<String>) {
        let now = self.clock.now();
        self.splits.push(PhaseSplit {
            phase: label.into(),
            millis: now.saturating_sub(self.last).as_millis() as u64,
        });
        self.last = now;
    }

    /// Time since the timer started
    pub fn elapsed(&self) -> Duration {
        self.clock.since(self.start)
    }

    pub fn splits(&self) -> &[PhaseSplit] {
        &self.splits
    }

    pub fn into_splits(self) -> Vec<PhaseSplit> {
        self.splits
    }
}
