//! Snapshot of a single cache slot.

use tokio::time::Instant;

/// The state of one key as seen by a consumer.
///
/// Returned by value from [`DataCache::get`](super::DataCache::get); later
/// writes to the cache do not affect a snapshot already handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// Last successfully fetched value, if any.
    pub data: Option<V>,

    /// When `data` was stored.
    pub timestamp: Option<Instant>,

    /// A fetch for this key is in flight. Stale `data` may still be present.
    pub loading: bool,
}

impl<V> CacheEntry<V> {
    /// An entry for a key that was never populated.
    pub fn empty() -> Self {
        Self {
            data: None,
            timestamp: None,
            loading: false,
        }
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

impl<V> Default for CacheEntry<V> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Internal per-key state. `refresh_flag` never leaves the cache inside an
/// entry; it is read through its own accessor.
#[derive(Debug, Clone)]
pub(crate) struct Slot<V> {
    pub(crate) data: Option<V>,
    pub(crate) timestamp: Option<Instant>,
    pub(crate) loading: bool,
    pub(crate) refresh_flag: bool,
}

impl<V> Slot<V> {
    pub(crate) fn new() -> Self {
        Self {
            data: None,
            timestamp: None,
            loading: false,
            refresh_flag: false,
        }
    }

    pub(crate) fn age(&self, now: Instant) -> Option<std::time::Duration> {
        self.timestamp.map(|ts| now.duration_since(ts))
    }
}

impl<V: Clone> Slot<V> {
    pub(crate) fn snapshot(&self) -> CacheEntry<V> {
        CacheEntry {
            data: self.data.clone(),
            timestamp: self.timestamp,
            loading: self.loading,
        }
    }
}
