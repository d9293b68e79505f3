//! Caching utilities.
//!
//! This module provides the TTL data cache consumed by list views: freshness
//! checks, explicit invalidation, loading flags, change notifications and
//! inspection stats.

pub mod data_cache;
pub mod entry;
pub mod events;
pub mod stats;

pub use data_cache::{DataCache, FetchPolicy, Origin, TtlRule, DEFAULT_EVENT_CAPACITY, DEFAULT_TTL};
pub use entry::CacheEntry;
pub use events::{CacheEvent, CacheEventKind};
pub use stats::{CacheStats, KeyStats};
