use crate::domain::CacheKey;
use crate::error::SourceResult;
use async_trait::async_trait;
use serde_json::Value;

/// Source of record for cached views.
///
/// This is the fetch-function seam of the cache: implementations know how
/// to retrieve the current data for a key (HTTP, fixtures, a mock) and
/// nothing about caching.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Retrieve the current data for `key`.
    async fn fetch(&self, key: &CacheKey) -> SourceResult<Value>;

    /// Short name for logs.
    fn name(&self) -> &'static str {
        "source"
    }
}
