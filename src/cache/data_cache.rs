//! Time-based data cache with explicit invalidation and loading tracking.
//!
//! `DataCache` sits between UI consumers and a remote fetch function. It
//! decides whether a cached value may be reused, tracks whether a fetch is
//! in flight, and lets writers elsewhere force fresh reads by invalidating
//! keys. Handles are cheap to clone and share the same state.

use super::entry::{CacheEntry, Slot};
use super::events::{CacheEvent, CacheEventKind};
use super::stats::{CacheStats, KeyStats};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::{broadcast, OwnedMutexGuard};
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Freshness window applied when no override matches.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Capacity of the change-notification channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Computes a TTL for a key, or `None` to fall back to the default.
pub type TtlRule<K> = Arc<dyn Fn(&K) -> Option<Duration> + Send + Sync>;

/// How concurrent `get_or_fetch` calls for the same stale key behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    /// One fetch per key at a time. Callers that waited reuse the value the
    /// previous fetch stored; if it failed they fetch themselves.
    #[default]
    Deduplicate,

    /// Every caller fetches. The last `set_data` wins.
    Overlap,
}

impl FromStr for FetchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deduplicate" | "dedup" => Ok(Self::Deduplicate),
            "overlap" => Ok(Self::Overlap),
            other => Err(format!(
                "expected 'deduplicate' or 'overlap', got '{}'",
                other
            )),
        }
    }
}

/// Where a value returned by [`DataCache::get_or_fetch_with_origin`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Fresh data was already cached.
    Cache,

    /// This call ran the fetch function.
    Fetched,

    /// Another caller's fetch completed while this one waited.
    Shared,
}

struct SharedState<K, V> {
    slots: RwLock<HashMap<K, Slot<V>>>,
    ttl_overrides: RwLock<HashMap<K, Duration>>,
    in_flight: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
}

/// In-memory cache with per-key freshness windows.
///
/// Entries are created lazily, populated by [`set_data`](Self::set_data),
/// and cleared (but never removed) by [`invalidate`](Self::invalidate).
/// A key is fresh while `now - timestamp < ttl_for(key)`.
///
/// Lock order is slots before TTL overrides; no lock is held across an
/// `.await`.
pub struct DataCache<K, V> {
    shared: Arc<SharedState<K, V>>,
    ttl: Duration,
    ttl_rule: Option<TtlRule<K>>,
    policy: FetchPolicy,
    events: broadcast::Sender<CacheEvent<K>>,
}

impl<K, V> Clone for DataCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            ttl: self.ttl,
            ttl_rule: self.ttl_rule.clone(),
            policy: self.policy,
            events: self.events.clone(),
        }
    }
}

impl<K, V> DataCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    /// Create a cache whose keys stay fresh for `ttl` after each store.
    pub fn new(ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            shared: Arc::new(SharedState {
                slots: RwLock::new(HashMap::new()),
                ttl_overrides: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
            }),
            ttl,
            ttl_rule: None,
            policy: FetchPolicy::default(),
            events,
        }
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the notification channel. Existing subscribers stop
    /// receiving events, so call this before handing out receivers.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        self.events = events;
        self
    }

    /// Derive TTLs from the key itself (e.g. per resource).
    pub fn with_ttl_rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&K) -> Option<Duration> + Send + Sync + 'static,
    {
        self.ttl_rule = Some(Arc::new(rule));
        self
    }

    pub fn with_ttl_override(self, key: K, ttl: Duration) -> Self {
        self.set_ttl_override(key, ttl);
        self
    }

    /// Use `ttl` for exactly this key. Takes precedence over any rule.
    pub fn set_ttl_override(&self, key: K, ttl: Duration) {
        self.shared
            .ttl_overrides
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, ttl);
    }

    pub fn clear_ttl_override(&self, key: &K) {
        self.shared
            .ttl_overrides
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// The default TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Effective TTL for `key`: exact override, then rule, then default.
    pub fn ttl_for(&self, key: &K) -> Duration {
        let overridden = self
            .shared
            .ttl_overrides
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied();

        overridden
            .or_else(|| self.ttl_rule.as_ref().and_then(|rule| rule(key)))
            .unwrap_or(self.ttl)
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }

    /// True iff `key` has a timestamp younger than its TTL.
    pub fn is_valid(&self, key: &K) -> bool {
        let now = Instant::now();
        let slots = self.read_slots();
        slots
            .get(key)
            .and_then(|slot| slot.age(now))
            .is_some_and(|age| age < self.ttl_for(key))
    }

    /// Current state of `key`; an empty entry if it was never touched.
    pub fn get(&self, key: &K) -> CacheEntry<V> {
        self.read_slots()
            .get(key)
            .map(Slot::snapshot)
            .unwrap_or_default()
    }

    /// Flipped on every invalidation of `key`; `false` for untouched keys.
    pub fn refresh_flag(&self, key: &K) -> bool {
        self.read_slots()
            .get(key)
            .is_some_and(|slot| slot.refresh_flag)
    }

    /// Store `data`, stamp it with the current time and clear `loading`.
    ///
    /// Overwrites any previous value.
    pub fn set_data(&self, key: &K, data: V) {
        {
            let mut slots = self.write_slots();
            let slot = slots.entry(key.clone()).or_insert_with(Slot::new);
            slot.data = Some(data);
            slot.timestamp = Some(Instant::now());
            slot.loading = false;
        }

        trace!(key = ?key, "Cache entry stored");
        self.emit(key, CacheEventKind::DataStored);
    }

    /// Toggle the loading flag. Data and timestamp are left alone.
    pub fn set_loading(&self, key: &K, loading: bool) {
        let changed = {
            let mut slots = self.write_slots();
            let slot = slots.entry(key.clone()).or_insert_with(Slot::new);
            let changed = slot.loading != loading;
            slot.loading = loading;
            changed
        };

        if changed {
            self.emit(key, CacheEventKind::LoadingChanged(loading));
        }
    }

    /// Clear data and timestamp, reset `loading` and flip the refresh flag.
    ///
    /// The key stays known to the cache with an empty entry.
    pub fn invalidate(&self, key: &K) {
        let refresh_flag = {
            let mut slots = self.write_slots();
            let slot = slots.entry(key.clone()).or_insert_with(Slot::new);
            clear_slot(slot)
        };

        debug!(key = ?key, refresh_flag, "Cache entry invalidated");
        self.emit(key, CacheEventKind::Invalidated { refresh_flag });
    }

    /// [`invalidate`](Self::invalidate) each key.
    pub fn invalidate_multiple<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        for key in keys {
            self.invalidate(key);
        }
    }

    /// Invalidate every known key matching `predicate`. Returns those keys.
    pub fn invalidate_where<F>(&self, mut predicate: F) -> Vec<K>
    where
        F: FnMut(&K) -> bool,
    {
        let invalidated: Vec<(K, bool)> = {
            let mut slots = self.write_slots();
            slots
                .iter_mut()
                .filter(|(key, _)| predicate(key))
                .map(|(key, slot)| (key.clone(), clear_slot(slot)))
                .collect()
        };

        for (key, refresh_flag) in &invalidated {
            debug!(key = ?key, refresh_flag = *refresh_flag, "Cache entry invalidated");
            self.emit(
                key,
                CacheEventKind::Invalidated {
                    refresh_flag: *refresh_flag,
                },
            );
        }

        invalidated.into_iter().map(|(key, _)| key).collect()
    }

    /// Invalidate every known key. Returns how many were invalidated.
    pub fn clear_all(&self) -> usize {
        let count = self.invalidate_where(|_| true).len();
        debug!(count, "Cleared all cache entries");
        count
    }

    /// Return cached data if fresh, otherwise fetch, store and return it.
    ///
    /// On fetch failure the error is returned unchanged, `loading` is reset
    /// and any previously cached data is kept.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.get_or_fetch_with_origin(key, fetch)
            .await
            .map(|(value, _)| value)
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch), also reporting whether the
    /// value was a cache hit, a fetch, or shared from a concurrent fetch.
    pub async fn get_or_fetch_with_origin<F, Fut, E>(
        &self,
        key: &K,
        fetch: F,
    ) -> Result<(V, Origin), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(data) = self.fresh_data(key) {
            trace!(key = ?key, "Cache hit");
            return Ok((data, Origin::Cache));
        }

        let _flight = match self.acquire_flight(key).await {
            Ok(flight) => flight,
            Err(data) => return Ok((data, Origin::Shared)),
        };

        debug!(key = ?key, "Cache miss, fetching");
        self.set_loading(key, true);
        let mut reset = LoadingReset::new(self.clone(), key.clone());

        let data = fetch().await?;

        reset.disarm();
        self.set_data(key, data.clone());
        Ok((data, Origin::Fetched))
    }

    /// Like [`get_or_fetch_with_origin`](Self::get_or_fetch_with_origin), but
    /// the fetch and the store run on a spawned task.
    ///
    /// Dropping the returned future does not cancel the fetch: it still
    /// completes and populates the cache. A panicking fetch surfaces as
    /// `E::from(JoinError)` with `loading` reset.
    pub async fn get_or_fetch_detached<F, Fut, E>(
        &self,
        key: &K,
        fetch: F,
    ) -> Result<(V, Origin), E>
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: From<JoinError> + Send + 'static,
    {
        if let Some(data) = self.fresh_data(key) {
            trace!(key = ?key, "Cache hit");
            return Ok((data, Origin::Cache));
        }

        let flight = match self.acquire_flight(key).await {
            Ok(flight) => flight,
            Err(data) => return Ok((data, Origin::Shared)),
        };

        debug!(key = ?key, "Cache miss, fetching on detached task");
        self.set_loading(key, true);
        let reset = LoadingReset::new(self.clone(), key.clone());
        let cache = self.clone();
        let owned_key = key.clone();
        let pending = fetch();

        let task = tokio::spawn(async move {
            // Released only after the store, so waiters see the new value
            let _flight = flight;
            let mut reset = reset;
            let data = pending.await?;
            reset.disarm();
            cache.set_data(&owned_key, data.clone());
            Ok::<V, E>(data)
        });

        let data = task.await.map_err(E::from)??;
        Ok((data, Origin::Fetched))
    }

    /// Subscribe to change notifications for every key.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent<K>> {
        self.events.subscribe()
    }

    /// Whether `key` has ever been touched.
    pub fn contains_key(&self, key: &K) -> bool {
        self.read_slots().contains_key(key)
    }

    /// Every known key, in no particular order.
    pub fn keys(&self) -> Vec<K> {
        self.read_slots().keys().cloned().collect()
    }

    /// Number of known keys, including invalidated ones.
    pub fn len(&self) -> usize {
        self.read_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freshness report for every known key.
    pub fn stats(&self) -> CacheStats<K> {
        let now = Instant::now();
        let slots = self.read_slots();
        let entries = slots
            .iter()
            .map(|(key, slot)| {
                let ttl = self.ttl_for(key);
                let age = slot.age(now);
                KeyStats {
                    key: key.clone(),
                    age,
                    ttl,
                    remaining: age.map_or(Duration::ZERO, |age| ttl.saturating_sub(age)),
                    is_expired: !age.is_some_and(|age| age < ttl),
                    loading: slot.loading,
                    has_data: slot.data.is_some(),
                    refresh_flag: slot.refresh_flag,
                }
            })
            .collect();

        CacheStats {
            default_ttl: self.ttl,
            entries,
        }
    }

    fn fresh_data(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let slots = self.read_slots();
        let slot = slots.get(key)?;
        let age = slot.age(now)?;
        if age < self.ttl_for(key) {
            slot.data.clone()
        } else {
            None
        }
    }

    /// Under `Deduplicate`, wait for any in-flight fetch of `key`. Returns
    /// the value it stored, or the permit to fetch.
    async fn acquire_flight(&self, key: &K) -> Result<Option<FlightPermit<K, V>>, V> {
        match self.policy {
            FetchPolicy::Deduplicate => {
                let guard = self.flight_lock(key).lock_owned().await;
                let permit = FlightPermit {
                    cache: self.clone(),
                    key: key.clone(),
                    guard: Some(guard),
                };
                match self.fresh_data(key) {
                    Some(data) => {
                        trace!(key = ?key, "Reusing data from concurrent fetch");
                        Err(data)
                    }
                    None => Ok(Some(permit)),
                }
            }
            FetchPolicy::Overlap => Ok(None),
        }
    }

    fn flight_lock(&self, key: &K) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self
            .shared
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(key.clone()).or_default())
    }

    fn emit(&self, key: &K, kind: CacheEventKind) {
        if self.events.receiver_count() > 0 {
            // Only fails when every receiver dropped in between.
            let _ = self.events.send(CacheEvent {
                key: key.clone(),
                kind,
            });
        }
    }

    fn read_slots(&self) -> RwLockReadGuard<'_, HashMap<K, Slot<V>>> {
        self.shared
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slots(&self) -> RwLockWriteGuard<'_, HashMap<K, Slot<V>>> {
        self.shared
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> Default for DataCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<K, V> fmt::Debug for DataCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataCache")
            .field("ttl", &self.ttl)
            .field("policy", &self.policy)
            .field("entries", &self.len())
            .finish()
    }
}

/// Returns the refresh flag after flipping it.
fn clear_slot<V>(slot: &mut Slot<V>) -> bool {
    slot.data = None;
    slot.timestamp = None;
    slot.loading = false;
    slot.refresh_flag = !slot.refresh_flag;
    slot.refresh_flag
}

/// Resets `loading` if a fetch fails or its future is dropped mid-flight.
struct LoadingReset<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    cache: DataCache<K, V>,
    key: K,
    armed: bool,
}

impl<K, V> LoadingReset<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    fn new(cache: DataCache<K, V>, key: K) -> Self {
        Self {
            cache,
            key,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<K, V> Drop for LoadingReset<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    fn drop(&mut self) {
        if self.armed {
            self.cache.set_loading(&self.key, false);
        }
    }
}

/// Holds the per-key fetch lock. On release the key's lock is dropped from
/// the in-flight map unless another caller is waiting on it.
struct FlightPermit<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    cache: DataCache<K, V>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K, V> Drop for FlightPermit<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    fn drop(&mut self) {
        let mut in_flight = self
            .cache
            .shared
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        drop(self.guard.take());

        let idle = in_flight
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            in_flight.remove(&self.key);
        }
    }
}
