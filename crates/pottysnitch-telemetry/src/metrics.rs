//! Request counters for the location API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Counters for the location endpoints.
#[derive(Debug, Default)]
pub struct ApiMetrics {
    list_requests: AtomicU64,
    list_failures: AtomicU64,
    submissions_accepted: AtomicU64,
    submissions_rejected: AtomicU64,
    submissions_failed: AtomicU64,
}

impl ApiMetrics {
    /// Creates a zeroed set of counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a list request and whether it succeeded.
    pub fn record_list(&self, ok: bool) {
        self.list_requests.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.list_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a persisted submission.
    pub fn record_accepted(&self) {
        self.submissions_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a submission refused because of its payload.
    pub fn record_rejected(&self) {
        self.submissions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a submission that could not be persisted.
    pub fn record_failed(&self) {
        self.submissions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            list_requests: self.list_requests.load(Ordering::Relaxed),
            list_failures: self.list_failures.load(Ordering::Relaxed),
            submissions_accepted: self.submissions_accepted.load(Ordering::Relaxed),
            submissions_rejected: self.submissions_rejected.load(Ordering::Relaxed),
            submissions_failed: self.submissions_failed.load(Ordering::Relaxed),
        }
    }
}

/// Serializable view of [`ApiMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// List requests served, including failures.
    pub list_requests: u64,
    /// List requests that failed.
    pub list_failures: u64,
    /// Submissions persisted.
    pub submissions_accepted: u64,
    /// Submissions refused as malformed or invalid.
    pub submissions_rejected: u64,
    /// Submissions that failed to persist.
    pub submissions_failed: u64,
}

/// Timer for measuring operation duration.
pub struct Timer {
    start: Instant,
    label: &'static str,
}

impl Timer {
    /// Starts a new timer.
    #[must_use]
    pub fn start(label: &'static str) -> Self {
        Self {
            start: Instant::now(),
            label,
        }
    }

    /// Returns the elapsed duration in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Stops the timer and logs the duration.
    pub fn stop(self) {
        let elapsed = self.elapsed_ms();
        tracing::debug!(label = self.label, elapsed_ms = elapsed, "Timer stopped");
    }
}
