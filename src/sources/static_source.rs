//! Fixture-backed data source.

use super::traits::DataSource;
use crate::domain::{CacheKey, Resource};
use crate::error::{SourceError, SourceResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// In-memory [`DataSource`] serving fixtures.
///
/// Lookups try the exact key first, then the unscoped key of the same
/// resource. Useful for tests and for running the inspector without an API.
/// Clones share fixtures and call counts.
#[derive(Clone, Default)]
pub struct StaticDataSource {
    fixtures: Arc<Mutex<HashMap<CacheKey, Value>>>,
    failing: Arc<Mutex<HashSet<CacheKey>>>,
    call_counts: Arc<Mutex<HashMap<CacheKey, usize>>>,
    latency: Option<Duration>,
}

impl StaticDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every fetch by `latency` (tokio time, so paused clocks apply).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Serve `value` for `key`. Replaces an existing fixture.
    pub fn insert(&self, key: impl Into<CacheKey>, value: Value) {
        lock(&self.fixtures).insert(key.into(), value);
    }

    /// Make fetches of `key` fail until [`recover`](Self::recover) is called.
    pub fn fail(&self, key: impl Into<CacheKey>) {
        lock(&self.failing).insert(key.into());
    }

    pub fn recover(&self, key: &CacheKey) {
        lock(&self.failing).remove(key);
    }

    /// Number of fetches issued for `key`, successful or not.
    pub fn call_count(&self, key: &CacheKey) -> usize {
        lock(&self.call_counts).get(key).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.call_counts).values().sum()
    }

    pub fn reset_call_counts(&self) {
        lock(&self.call_counts).clear();
    }

    fn lookup(&self, key: &CacheKey) -> SourceResult<Value> {
        if lock(&self.failing).contains(key) {
            return Err(SourceError::Other(format!("fixture failure for {}", key)));
        }

        let fixtures = lock(&self.fixtures);
        fixtures
            .get(key)
            .or_else(|| fixtures.get(&CacheKey::new(key.resource())))
            .cloned()
            .ok_or_else(|| SourceError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl DataSource for StaticDataSource {
    async fn fetch(&self, key: &CacheKey) -> SourceResult<Value> {
        *lock(&self.call_counts).entry(key.clone()).or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.lookup(key)
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

impl std::fmt::Debug for StaticDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticDataSource")
            .field("fixtures", &lock(&self.fixtures).len())
            .field("latency", &self.latency)
            .finish()
    }
}

/// Fixtures for every resource, used by the inspector when no API is configured.
pub fn demo_fixtures() -> StaticDataSource {
    let source = StaticDataSource::new();
    for resource in Resource::ALL {
        source.insert(resource, Value::Array(Vec::new()));
    }
    source.insert(
        Resource::Practices,
        serde_json::json!([
            {"id": 1, "date": "2026-03-02", "focus": "block starts"},
            {"id": 2, "date": "2026-03-04", "focus": "tempo 200s"}
        ]),
    );
    source.insert(
        Resource::Meets,
        serde_json::json!([{"id": 10, "name": "Spring Invitational", "date": "2026-04-11"}]),
    );
    source.insert(
        Resource::Measurables,
        serde_json::json!([{"id": 5, "athlete": "a1", "kind": "flying_30m", "value": 3.41}]),
    );
    source
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
