//! Cache metrics tracking.
//!
//! Counters for cache effectiveness (hits, misses, shared fetches) and for
//! the data source behind it, plus a timer that logs operation durations.

use crate::cache::Origin;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counters shared by every clone.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    hits_total: Arc<AtomicU64>,
    misses_total: Arc<AtomicU64>,
    shared_total: Arc<AtomicU64>,
    fetch_failures_total: Arc<AtomicU64>,
    fetch_duration_total_ms: Arc<AtomicU64>,
    invalidations_total: Arc<AtomicU64>,
}

impl CacheMetrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track how a lookup was served.
    pub fn track_lookup(&self, key: &str, origin: Origin) {
        match origin {
            Origin::Cache => {
                self.hits_total.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key = %key, "Cache hit");
            }
            Origin::Shared => {
                self.shared_total.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key = %key, "Cache hit after concurrent fetch");
            }
            Origin::Fetched => {
                self.misses_total.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key = %key, "Cache miss");
            }
        }
    }

    /// Track a completed fetch against the data source.
    pub fn track_fetch(&self, key: &str, duration_ms: u128, success: bool) {
        self.fetch_duration_total_ms
            .fetch_add(duration_ms as u64, Ordering::Relaxed);
        if !success {
            self.fetch_failures_total.fetch_add(1, Ordering::Relaxed);
            // A failed fetch is still a miss
            self.misses_total.fetch_add(1, Ordering::Relaxed);
        }

        tracing::debug!(
            key = %key,
            duration_ms = duration_ms,
            success = success,
            "Fetch completed"
        );
    }

    /// Track invalidated keys.
    pub fn track_invalidations(&self, count: usize) {
        self.invalidations_total
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn hits_total(&self) -> u64 {
        self.hits_total.load(Ordering::Relaxed)
    }

    pub fn misses_total(&self) -> u64 {
        self.misses_total.load(Ordering::Relaxed)
    }

    pub fn shared_total(&self) -> u64 {
        self.shared_total.load(Ordering::Relaxed)
    }

    pub fn fetch_failures_total(&self) -> u64 {
        self.fetch_failures_total.load(Ordering::Relaxed)
    }

    pub fn invalidations_total(&self) -> u64 {
        self.invalidations_total.load(Ordering::Relaxed)
    }

    /// Fraction of lookups served without calling the source (0.0 to 1.0).
    ///
    /// Shared results count as hits.
    pub fn hit_rate(&self) -> f64 {
        let hits = (self.hits_total() + self.shared_total()) as f64;
        let total = hits + self.misses_total() as f64;

        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Average fetch duration in milliseconds.
    pub fn fetch_duration_avg_ms(&self) -> f64 {
        let fetches = self.misses_total();
        if fetches == 0 {
            0.0
        } else {
            self.fetch_duration_total_ms.load(Ordering::Relaxed) as f64 / fetches as f64
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.hits_total,
            &self.misses_total,
            &self.shared_total,
            &self.fetch_failures_total,
            &self.fetch_duration_total_ms,
            &self.invalidations_total,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// A snapshot of all counters.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            hits_total: self.hits_total(),
            misses_total: self.misses_total(),
            shared_total: self.shared_total(),
            fetch_failures_total: self.fetch_failures_total(),
            invalidations_total: self.invalidations_total(),
            hit_rate: self.hit_rate(),
            fetch_duration_avg_ms: self.fetch_duration_avg_ms(),
        }
    }
}

/// A snapshot of metrics values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub hits_total: u64,
    pub misses_total: u64,
    pub shared_total: u64,
    pub fetch_failures_total: u64,
    pub invalidations_total: u64,
    pub hit_rate: f64,
    pub fetch_duration_avg_ms: f64,
}

/// A timer for tracking operation duration.
pub struct Timer {
    start: Instant,
    operation: String,
}

impl Timer {
    /// Start a new timer for the given operation.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            operation: operation.into(),
        }
    }

    /// Finish the timer and return the elapsed time in milliseconds.
    pub fn finish(self) -> u128 {
        let duration_ms = self.start.elapsed().as_millis();

        tracing::debug!(
            operation = %self.operation,
            duration_ms = duration_ms,
            "Operation completed"
        );

        duration_ms
    }

    /// Finish the timer with a specific status.
    pub fn finish_with_status(self, success: bool) -> u128 {
        let duration_ms = self.start.elapsed().as_millis();

        if success {
            tracing::debug!(
                operation = %self.operation,
                duration_ms = duration_ms,
                "Operation succeeded"
            );
        } else {
            tracing::warn!(
                operation = %self.operation,
                duration_ms = duration_ms,
                "Operation failed"
            );
        }

        duration_ms
    }
}
