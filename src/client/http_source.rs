//! Async data source backed by the synchronous TrackApiClient.
//!
//! HTTP calls run on tokio's blocking thread pool through
//! `tokio::task::spawn_blocking`, so they never stall the async runtime.

use crate::client::TrackApiClient;
use crate::domain::CacheKey;
use crate::error::SourceResult;
use crate::sources::DataSource;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// [`DataSource`] that reads collections from the Track API.
#[derive(Clone, Debug)]
pub struct HttpDataSource {
    client: Arc<TrackApiClient>,
}

impl HttpDataSource {
    pub fn new(client: TrackApiClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch(&self, key: &CacheKey) -> SourceResult<Value> {
        let client = self.client.clone();
        let key = key.clone();

        tokio::task::spawn_blocking(move || client.fetch_collection(&key)).await?
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
