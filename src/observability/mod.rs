//! Observability module for monitoring and metrics.
//!
//! Cache hit/miss counters, fetch timing, and structured logging through
//! `tracing`.

pub mod metrics;

pub use metrics::{CacheMetrics, MetricsSummary, Timer};
