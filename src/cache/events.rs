//! Change notifications emitted by the cache.

/// What happened to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    /// Fresh data was stored.
    DataStored,

    /// The loading flag changed to the contained value.
    LoadingChanged(bool),

    /// Data and timestamp were cleared. Carries the refresh flag after the flip.
    Invalidated { refresh_flag: bool },
}

/// A change to one key, delivered to every [`subscribe`](super::DataCache::subscribe)r.
///
/// Receivers that fall behind the channel capacity get
/// `RecvError::Lagged` and should re-read the keys they display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent<K> {
    pub key: K,
    pub kind: CacheEventKind,
}

impl<K> CacheEvent<K> {
    pub fn is_invalidation(&self) -> bool {
        matches!(self.kind, CacheEventKind::Invalidated { .. })
    }
}
