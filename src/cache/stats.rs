//! Inspection data for debug panels.

use serde::{Serialize, Serializer};
use std::time::Duration;

/// Freshness report for one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyStats<K> {
    pub key: K,

    /// Time since data was stored. `None` means never stored (infinite age).
    #[serde(rename = "age_ms", serialize_with = "opt_millis")]
    pub age: Option<Duration>,

    /// Effective TTL for this key, overrides applied.
    #[serde(rename = "ttl_ms", serialize_with = "millis")]
    pub ttl: Duration,

    /// `max(0, ttl - age)`; zero when never stored.
    #[serde(rename = "remaining_ms", serialize_with = "millis")]
    pub remaining: Duration,

    pub is_expired: bool,
    pub loading: bool,
    pub has_data: bool,
    pub refresh_flag: bool,
}

/// Snapshot of every known key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats<K> {
    #[serde(rename = "default_ttl_ms", serialize_with = "millis")]
    pub default_ttl: Duration,

    pub entries: Vec<KeyStats<K>>,
}

impl<K: PartialEq> CacheStats<K> {
    /// Stats for a specific key.
    pub fn entry(&self, key: &K) -> Option<&KeyStats<K>> {
        self.entries.iter().find(|e| &e.key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn expired_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_expired).count()
    }

    pub fn loading_count(&self) -> usize {
        self.entries.iter().filter(|e| e.loading).count()
    }
}

fn millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

fn opt_millis<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_some(&(d.as_millis() as u64)),
        None => s.serialize_none(),
    }
}
