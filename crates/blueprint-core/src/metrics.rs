//! Global atomic counters for pipeline observability.
//!
//! Counters are incremented silently at the call site and are cumulative for
//! the life of the process. A run takes a [`Metrics::snapshot`] when it starts
//! and reports [`MetricsSnapshot::since`] that snapshot when it finishes, so
//! each run sees only its own work. Runs on concurrent threads share the
//! counters and may observe each other's increments.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    descriptors_canonicalized: AtomicU64,
    violations: AtomicU64,
    files_written: AtomicU64,
    drift_detected: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            descriptors_canonicalized: AtomicU64::new(0),
            violations: AtomicU64::new(0),
            files_written: AtomicU64::new(0),
            drift_detected: AtomicU64::new(0),
        }
    }

    pub fn inc_descriptors_canonicalized(&self) {
        self.descriptors_canonicalized.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "descriptors_canonicalized", "counter incremented");
    }

    /// Add `n` to the violations counter.
    pub fn add_violations(&self, n: u64) {
        self.violations.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "violations", n, "counter incremented");
    }

    pub fn inc_files_written(&self) {
        self.files_written.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "files_written", "counter incremented");
    }

    pub fn inc_drift(&self) {
        self.drift_detected.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "drift_detected", "counter incremented");
    }

    /// Current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            descriptors_canonicalized: self.descriptors_canonicalized(),
            violations: self.violations(),
            files_written: self.files_written(),
            drift_detected: self.drift_detected(),
        }
    }

    pub fn descriptors_canonicalized(&self) -> u64 {
        self.descriptors_canonicalized.load(Ordering::Relaxed)
    }

    pub fn violations(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }

    pub fn files_written(&self) -> u64 {
        self.files_written.load(Ordering::Relaxed)
    }

    pub fn drift_detected(&self) -> u64 {
        self.drift_detected.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.descriptors_canonicalized.store(0, Ordering::Relaxed);
        self.violations.store(0, Ordering::Relaxed);
        self.files_written.store(0, Ordering::Relaxed);
        self.drift_detected.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time counter values, or the difference between two of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub descriptors_canonicalized: u64,
    pub violations: u64,
    pub files_written: u64,
    pub drift_detected: u64,
}

impl MetricsSnapshot {
    /// Counts accumulated after `earlier` was taken.
    pub fn since(&self, earlier: &MetricsSnapshot) -> MetricsSnapshot {
        MetricsSnapshot {
            descriptors_canonicalized: self
                .descriptors_canonicalized
                .saturating_sub(earlier.descriptors_canonicalized),
            violations: self.violations.saturating_sub(earlier.violations),
            files_written: self.files_written.saturating_sub(earlier.files_written),
            drift_detected: self.drift_detected.saturating_sub(earlier.drift_detected),
        }
    }

    /// Emit the values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            descriptors_canonicalized = self.descriptors_canonicalized,
            violations = self.violations,
            files_written = self.files_written,
            drift_detected = self.drift_detected,
        );
    }
}
