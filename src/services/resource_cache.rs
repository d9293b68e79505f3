//! Cached resource service.
//!
//! Binds a `DataCache<CacheKey, Value>` to a [`DataSource`]: reads go through
//! the cache, and writes made elsewhere in the application are reported here
//! so every affected view is invalidated.

use crate::cache::{CacheEvent, CacheStats, DataCache};
use crate::config::Config;
use crate::domain::{CacheKey, Resource};
use crate::error::SourceResult;
use crate::observability::{CacheMetrics, Timer};
use crate::sources::DataSource;
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Cached read access to the application's resources.
#[async_trait]
pub trait ResourceService: Send + Sync {
    /// Cached data for `key`, fetching it when absent or stale.
    ///
    /// A failed fetch returns the source error and leaves any cached data
    /// in place.
    async fn load(&self, key: &CacheKey) -> SourceResult<Value>;

    /// [`load`](Self::load) several keys concurrently. Results keep the
    /// order of `keys`.
    async fn load_many(&self, keys: &[CacheKey]) -> Vec<SourceResult<Value>>;

    /// Report a successful create/update/delete of `resource`.
    ///
    /// Invalidates every known key of the resource and of its dependents
    /// and returns them sorted.
    fn record_write(&self, resource: Resource) -> Vec<CacheKey>;

    /// Invalidate every known key of `resource`, whatever its scope.
    fn invalidate_resource(&self, resource: Resource) -> Vec<CacheKey>;

    /// Freshness report, sorted by key.
    fn stats(&self) -> CacheStats<CacheKey>;

    /// Invalidate every known key.
    fn clear_all(&self) -> usize;
}

/// Default implementation of ResourceService.
#[derive(Clone)]
pub struct ResourceCache {
    cache: DataCache<CacheKey, Value>,
    source: Arc<dyn DataSource>,
    metrics: CacheMetrics,
}

impl ResourceCache {
    /// Wrap an existing cache.
    pub fn new(cache: DataCache<CacheKey, Value>, source: Arc<dyn DataSource>) -> Self {
        Self {
            cache,
            source,
            metrics: CacheMetrics::new(),
        }
    }

    /// Build the cache from configuration: default TTL, per-resource TTL
    /// overrides, fetch policy and event capacity.
    pub fn from_config(config: &Config, source: Arc<dyn DataSource>) -> Self {
        let overrides = config.ttl_overrides.clone();
        let cache = DataCache::new(config.cache_ttl())
            .with_policy(config.fetch_policy)
            .with_event_capacity(config.event_capacity)
            .with_ttl_rule(move |key: &CacheKey| overrides.get(&key.resource()).copied());

        Self::new(cache, source)
    }

    /// The underlying cache, for direct `get`/`is_valid`/`refresh_flag` reads.
    pub fn cache(&self) -> &DataCache<CacheKey, Value> {
        &self.cache
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Change notifications for every key.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent<CacheKey>> {
        self.cache.subscribe()
    }

    fn invalidate_matching(&self, resources: &[Resource]) -> Vec<CacheKey> {
        let mut keys = self
            .cache
            .invalidate_where(|key| resources.contains(&key.resource()));
        keys.sort();
        self.metrics.track_invalidations(keys.len());
        keys
    }
}

#[async_trait]
impl ResourceService for ResourceCache {
    async fn load(&self, key: &CacheKey) -> SourceResult<Value> {
        let label = key.to_string();
        let source = Arc::clone(&self.source);
        let metrics = self.metrics.clone();
        let owned_key = key.clone();
        let fetch_label = label.clone();

        // The fetch outlives a caller that stops waiting and still fills the cache
        let fetched = self
            .cache
            .get_or_fetch_detached(key, move || async move {
                let timer = Timer::new(format!("fetch {}", fetch_label));
                let result = source.fetch(&owned_key).await;
                let duration_ms = timer.finish_with_status(result.is_ok());
                metrics.track_fetch(&fetch_label, duration_ms, result.is_ok());
                result
            })
            .await;

        match fetched {
            Ok((value, origin)) => {
                self.metrics.track_lookup(&label, origin);
                Ok(value)
            }
            Err(e) => {
                warn!(
                    key = %label,
                    source = self.source.name(),
                    transient = e.is_transient(),
                    error = %e,
                    stale_data = self.cache.get(key).has_data(),
                    "Fetch failed, cached data left in place"
                );
                Err(e)
            }
        }
    }

    async fn load_many(&self, keys: &[CacheKey]) -> Vec<SourceResult<Value>> {
        join_all(keys.iter().map(|key| self.load(key))).await
    }

    fn record_write(&self, resource: Resource) -> Vec<CacheKey> {
        let affected = resource.invalidation_set();
        let keys = self.invalidate_matching(&affected);
        info!(
            resource = %resource,
            invalidated = keys.len(),
            "Write recorded, dependent views invalidated"
        );
        keys
    }

    fn invalidate_resource(&self, resource: Resource) -> Vec<CacheKey> {
        self.invalidate_matching(&[resource])
    }

    fn stats(&self) -> CacheStats<CacheKey> {
        let mut stats = self.cache.stats();
        stats.entries.sort_by(|a, b| a.key.cmp(&b.key));
        stats
    }

    fn clear_all(&self) -> usize {
        let count = self.cache.clear_all();
        self.metrics.track_invalidations(count);
        info!(count, "All cache entries cleared");
        count
    }
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("cache", &self.cache)
            .field("source", &self.source.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FetchPolicy;
    use crate::domain::EntityId;
    use crate::sources::StaticDataSource;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    fn service(source: &StaticDataSource) -> ResourceCache {
        ResourceCache::from_config(&Config::default(), Arc::new(source.clone()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_from_config_applies_resource_overrides() {
        let config = Config {
            ttl_overrides: HashMap::from([(Resource::Measurables, Duration::from_secs(60))]),
            fetch_policy: FetchPolicy::Overlap,
            ..Config::default()
        };
        let service = ResourceCache::from_config(&config, Arc::new(StaticDataSource::new()));
        let scoped = CacheKey::new(Resource::Measurables).with("athlete", EntityId::new("a1").unwrap()).unwrap();

        assert_eq!(service.cache().ttl_for(&scoped), Duration::from_secs(60));
        assert_eq!(
            service.cache().ttl_for(&CacheKey::new(Resource::Meets)),
            Duration::from_secs(300)
        );
        assert_eq!(service.cache().policy(), FetchPolicy::Overlap);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_caches_until_write() {
        let source = StaticDataSource::new();
        source.insert(Resource::Practices, json!([{"id": 1}]));
        let service = service(&source);
        let key = CacheKey::new(Resource::Practices);

        assert_eq!(service.load(&key).await.unwrap(), json!([{"id": 1}]));
        assert_eq!(service.load(&key).await.unwrap(), json!([{"id": 1}]));
        assert_eq!(source.call_count(&key), 1);

        source.insert(Resource::Practices, json!([{"id": 1}, {"id": 2}]));
        assert_eq!(service.record_write(Resource::Practices), vec![key.clone()]);

        assert_eq!(service.load(&key).await.unwrap(), json!([{"id": 1}, {"id": 2}]));
        assert_eq!(source.call_count(&key), 2);

        let summary = service.metrics().summary();
        assert_eq!(summary.hits_total, 1);
        assert_eq!(summary.misses_total, 2);
        assert_eq!(summary.invalidations_total, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_keeps_stale_value() {
        let source = StaticDataSource::new();
        source.insert(Resource::Meets, json!(["spring"]));
        let service = service(&source);
        let key = CacheKey::new(Resource::Meets);

        service.load(&key).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        source.fail(Resource::Meets);

        assert!(service.load(&key).await.is_err());
        let entry = service.cache().get(&key);
        assert_eq!(entry.data, Some(json!(["spring"])));
        assert!(!entry.loading);
        assert_eq!(service.metrics().fetch_failures_total(), 1);
    }

    #[test]
    fn test_stats_sorted_by_key() {
        let service = service(&StaticDataSource::new());
        service.cache().set_data(&CacheKey::new(Resource::Programs), json!([]));
        service.cache().set_data(&CacheKey::new(Resource::Meets), json!([]));

        let keys: Vec<CacheKey> = service.stats().entries.into_iter().map(|e| e.key).collect();
        assert_eq!(
            keys,
            vec![CacheKey::new(Resource::Meets), CacheKey::new(Resource::Programs)]
        );
    }
}
