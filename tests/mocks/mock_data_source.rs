use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use track_data_cache::error::{SourceError, SourceResult};
use track_data_cache::sources::DataSource;
use track_data_cache::CacheKey;

/// Scripted data source for testing.
///
/// Each key has a queue of responses; the last response repeats once the
/// queue is down to one element.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct MockDataSource {
    responses: Arc<Mutex<HashMap<CacheKey, VecDeque<Result<Value, String>>>>>,
    call_counts: Arc<Mutex<HashMap<CacheKey, usize>>>,
    latency: Option<Duration>,
}

#[allow(dead_code)]
impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn respond(&self, key: &CacheKey, value: Value) {
        self.push(key, Ok(value));
    }

    pub fn fail(&self, key: &CacheKey, message: &str) {
        self.push(key, Err(message.to_string()));
    }

    pub fn get_call_count(&self, key: &CacheKey) -> usize {
        let counts = self.call_counts.lock().unwrap();
        *counts.get(key).unwrap_or(&0)
    }

    pub fn reset_call_counts(&self) {
        let mut counts = self.call_counts.lock().unwrap();
        counts.clear();
    }

    fn push(&self, key: &CacheKey, response: Result<Value, String>) {
        let mut responses = self.responses.lock().unwrap();
        responses.entry(key.clone()).or_default().push_back(response);
    }

    fn track_call(&self, key: &CacheKey) {
        let mut counts = self.call_counts.lock().unwrap();
        *counts.entry(key.clone()).or_insert(0) += 1;
    }

    fn next_response(&self, key: &CacheKey) -> SourceResult<Value> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses
            .get_mut(key)
            .ok_or_else(|| SourceError::NotFound(key.to_string()))?;

        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };

        match response {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(SourceError::ApiError {
                status: 503,
                message,
            }),
            None => Err(SourceError::NotFound(key.to_string())),
        }
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn fetch(&self, key: &CacheKey) -> SourceResult<Value> {
        self.track_call(key);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.next_response(key)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
