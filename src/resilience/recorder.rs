//! Outcome recorders.
//!
//! A recorder is the trip condition of a circuit breaker: it is fed one sample
//! per admitted, completed call while the breaker is Closed and answers whether
//! the breaker should open. Recorders are not synchronized themselves; the
//! owning breaker only touches them under its state lock.
//!
//! # Implementations
//! - [`ConsecutiveFailures`]: trips after N failures in a row.
//! - [`SlidingWindow`]: trips when the failure ratio over a trailing time
//!   window reaches a threshold, once enough samples exist.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Point-in-time view of a recorder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecorderStats {
    /// Samples currently counted (window size, or calls since last reset).
    pub total: u64,
    /// Failed samples among `total`.
    pub failures: u64,
    /// Current run of failures without an intervening success.
    pub consecutive_failures: u64,
    /// `failures / total`, or 0.0 when empty.
    pub failure_ratio: f64,
}

/// Trip condition fed by a circuit breaker.
pub trait OutcomeRecorder: Send + 'static {
    /// Record one outcome. Returns true when the breaker should open.
    fn record(&mut self, success: bool, now: Instant) -> bool;

    /// Forget everything recorded so far.
    fn reset(&mut self);

    fn stats(&mut self, now: Instant) -> RecorderStats;
}

/// Counts consecutive failures.
#[derive(Debug, Clone)]
pub struct ConsecutiveFailures {
    threshold: u32,
    consecutive: u32,
    total: u64,
    failures: u64,
}

impl ConsecutiveFailures {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive: 0,
            total: 0,
            failures: 0,
        }
    }
}

impl OutcomeRecorder for ConsecutiveFailures {
    fn record(&mut self, success: bool, _now: Instant) -> bool {
        self.total += 1;
        if success {
            self.consecutive = 0;
            return false;
        }

        self.failures += 1;
        self.consecutive += 1;
        self.consecutive >= self.threshold
    }

    fn reset(&mut self) {
        self.consecutive = 0;
        self.total = 0;
        self.failures = 0;
    }

    fn stats(&mut self, _now: Instant) -> RecorderStats {
        RecorderStats {
            total: self.total,
            failures: self.failures,
            consecutive_failures: self.consecutive as u64,
            failure_ratio: ratio(self.failures, self.total),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Instant,
    success: bool,
}

/// Time-bounded window of outcome samples.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    failure_ratio_threshold: f64,
    sampling_duration: Duration,
    minimum_throughput: u32,
    samples: VecDeque<Sample>,
    failures: u64,
    consecutive: u64,
}

impl SlidingWindow {
    pub fn new(
        failure_ratio_threshold: f64,
        sampling_duration: Duration,
        minimum_throughput: u32,
    ) -> Self {
        Self {
            failure_ratio_threshold,
            sampling_duration,
            minimum_throughput,
            samples: VecDeque::new(),
            failures: 0,
            consecutive: 0,
        }
    }

    /// Drop samples that fell out of the window.
    fn evict(&mut self, now: Instant) {
        while let Some(oldest) = self.samples.front() {
            if now.saturating_duration_since(oldest.at) < self.sampling_duration {
                break;
            }
            if !oldest.success {
                self.failures -= 1;
            }
            self.samples.pop_front();
        }
    }
}

impl OutcomeRecorder for SlidingWindow {
    fn record(&mut self, success: bool, now: Instant) -> bool {
        self.samples.push_back(Sample { at: now, success });
        if success {
            self.consecutive = 0;
        } else {
            self.failures += 1;
            self.consecutive += 1;
        }
        self.evict(now);

        let total = self.samples.len() as u64;
        if total < self.minimum_throughput as u64 {
            return false;
        }
        ratio(self.failures, total) >= self.failure_ratio_threshold
    }

    fn reset(&mut self) {
        self.samples.clear();
        self.failures = 0;
        self.consecutive = 0;
    }

    fn stats(&mut self, now: Instant) -> RecorderStats {
        self.evict(now);
        let total = self.samples.len() as u64;
        RecorderStats {
            total,
            failures: self.failures,
            consecutive_failures: self.consecutive,
            failure_ratio: ratio(self.failures, total),
        }
    }
}

fn ratio(failures: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        failures as f64 / total as f64
    }
}
