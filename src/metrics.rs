//! Scan metrics aggregation
//!
//! The coordinator is constructed with a metrics handle but the orchestration
//! logic itself never records into it; callers time whole runs around the
//! event stream instead.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A single named timing measurement
#[derive(Debug, Clone)]
pub struct TimerSample {
    pub name: String,
    pub duration: Duration,
}

/// Aggregates timing samples and counters across scans
#[derive(Debug, Default)]
pub struct ScanMetrics {
    samples: Mutex<Vec<TimerSample>>,
    counters: Mutex<HashMap<String, u64>>,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a named timer; stop it with [`NamedTimer::stop`]
    pub fn start_timer(&self, name: &str) -> NamedTimer {
        NamedTimer {
            name: name.to_string(),
            started_at: Instant::now(),
        }
    }

    /// Record a finished timer
    pub fn record(&self, timer: NamedTimer) {
        let sample = TimerSample {
            duration: timer.started_at.elapsed(),
            name: timer.name,
        };
        self.samples.lock().unwrap().push(sample);
    }

    /// Increment a named counter
    pub fn incr(&self, name: &str, by: u64) {
        *self
            .counters
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert(0) += by;
    }

    /// Read a counter value
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Snapshot of all timing samples recorded so far
    pub fn samples(&self) -> Vec<TimerSample> {
        self.samples.lock().unwrap().clone()
    }

    /// Total time recorded under a given timer name
    pub fn total_duration(&self, name: &str) -> Duration {
        self.samples
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.name == name)
            .map(|s| s.duration)
            .sum()
    }
}

/// Handle for an in-flight named timing measurement
#[derive(Debug)]
pub struct NamedTimer {
    name: String,
    started_at: Instant,
}

impl NamedTimer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
