//! HTTP client for the track-and-field REST API.
//!
//! This module provides a synchronous HTTP client that can be used from async contexts
//! via `tokio::task::spawn_blocking` (see [`HttpDataSource`]). It only reads
//! collections; writes go through the application's own API layer.

mod http_source;
pub use http_source::HttpDataSource;

use crate::config::Config;
use crate::domain::CacheKey;
use crate::error::{ConfigResult, SourceError, SourceResult};
use crate::observability::Timer;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// HTTP client for the Track API.
///
/// This client uses `ureq` for synchronous HTTP requests and can be called
/// from async contexts using `tokio::task::spawn_blocking`.
#[derive(Clone)]
pub struct TrackApiClient {
    /// Base URL for the Track API, without trailing slash
    base_url: String,

    /// Optional bearer token
    token: Option<String>,

    /// HTTP client agent
    agent: Arc<ureq::Agent>,
}

impl TrackApiClient {
    /// Create a client from configuration.
    ///
    /// Fails if `TRACK_API_BASE_URL` is not configured.
    pub fn new(config: &Config) -> ConfigResult<Self> {
        let base_url = config.require_api_base_url()?.to_string();
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout))
            .build();

        Ok(Self {
            base_url,
            token: config.api_token.clone(),
            agent: Arc::new(agent),
        })
    }

    /// Create a client with a custom base URL (useful for testing).
    #[doc(hidden)]
    pub fn with_base_url(base_url: String, token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .build();

        Self {
            base_url,
            token,
            agent: Arc::new(agent),
        }
    }

    /// Build the URL serving `key`: the resource path plus its scope as
    /// query parameters.
    fn build_url(&self, key: &CacheKey) -> String {
        let base = self.base_url.trim_end_matches('/');
        let mut url = format!("{}/{}", base, key.resource().path());

        let query: Vec<String> = key
            .scope_entries()
            .map(|(name, id)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(id.as_str())
                )
            })
            .collect();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    /// Fetch the collection for `key`.
    ///
    /// Bodies shaped `{"data": ...}` are unwrapped; anything else is
    /// returned as-is.
    pub fn fetch_collection(&self, key: &CacheKey) -> SourceResult<Value> {
        let timer = Timer::new(format!("GET {}", key));
        let url = self.build_url(key);

        let mut request = self.agent.get(&url).set("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(e) => {
                timer.finish_with_status(false);
                return Err(map_error(e, key));
            }
        };

        let body = response
            .into_string()
            .map_err(|e| SourceError::HttpError(e.to_string()));
        let parsed = body.and_then(|body| {
            serde_json::from_str::<Value>(&body).map_err(SourceError::JsonError)
        });
        timer.finish_with_status(parsed.is_ok());

        Ok(unwrap_envelope(parsed?))
    }
}

impl std::fmt::Debug for TrackApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackApiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Map a ureq error to a SourceError.
fn map_error(error: ureq::Error, key: &CacheKey) -> SourceError {
    match error {
        ureq::Error::Status(code, response) => {
            let message = response
                .into_string()
                .unwrap_or_else(|_| "Unknown error".to_string());

            match code {
                401 | 403 => SourceError::Unauthorized,
                404 => SourceError::NotFound(key.to_string()),
                _ => SourceError::ApiError {
                    status: code,
                    message,
                },
            }
        }
        ureq::Error::Transport(transport) => {
            if transport.kind() == ureq::ErrorKind::ConnectionFailed {
                SourceError::HttpError("Connection failed".to_string())
            } else if transport.kind() == ureq::ErrorKind::Io {
                SourceError::Timeout
            } else {
                SourceError::HttpError(transport.to_string())
            }
        }
    }
}

fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityId, Resource};
    use serde_json::json;

    #[test]
    fn test_build_url() {
        let client = TrackApiClient::with_base_url("https://api.example.com".to_string(), None);
        assert_eq!(
            client.build_url(&CacheKey::new(Resource::TrainingPeriods)),
            "https://api.example.com/training-periods"
        );

        let client_with_slash =
            TrackApiClient::with_base_url("https://api.example.com/".to_string(), None);
        let key = CacheKey::new(Resource::Practices)
            .with("period", EntityId::new("p 3").unwrap()).unwrap()
            .with("athlete", EntityId::new("a1").unwrap()).unwrap();
        assert_eq!(
            client_with_slash.build_url(&key),
            "https://api.example.com/practices?athlete=a1&period=p%203"
        );
    }

    #[test]
    fn test_client_requires_base_url() {
        assert!(TrackApiClient::new(&Config::default()).is_err());

        let config = Config {
            api_base_url: Some("https://track.example.com".to_string()),
            api_token: Some("secret".to_string()),
            ..Config::default()
        };
        let client = TrackApiClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://track.example.com");
        assert!(!format!("{:?}", client).contains("secret"));
    }

    #[test]
    fn test_unwrap_envelope() {
        assert_eq!(unwrap_envelope(json!({"data": [1, 2]})), json!([1, 2]));
        assert_eq!(unwrap_envelope(json!([1])), json!([1]));
        assert_eq!(unwrap_envelope(json!({"items": []})), json!({"items": []}));
    }
}
