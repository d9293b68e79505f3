//! Configuration management for the track data cache.
//!
//! This module handles loading and validating configuration from environment variables.
//! A `.env` file is honoured if present but never required.

use crate::cache::FetchPolicy;
use crate::domain::Resource;
use crate::error::{ConfigError, ConfigResult};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Configuration for the cache and the data source behind it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default freshness window in seconds (default: 300)
    pub cache_ttl_secs: u64,

    /// Per-resource TTLs that replace the default
    pub ttl_overrides: HashMap<Resource, Duration>,

    /// Behaviour of concurrent fetches for the same key (default: deduplicate)
    pub fetch_policy: FetchPolicy,

    /// Capacity of the change-notification channel (default: 64)
    pub event_capacity: usize,

    /// Track API base URL; when unset only in-memory sources are available
    pub api_base_url: Option<String>,

    /// Optional bearer token for the Track API
    pub api_token: Option<String>,

    /// HTTP request timeout in seconds (default: 10)
    pub request_timeout: u64,

    /// Log level used when RUST_LOG is unset (default: "info")
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `CACHE_TTL_SECONDS`: Default TTL in seconds (default: 300)
    /// - `CACHE_TTL_OVERRIDES`: `resource=seconds` pairs, comma separated
    /// - `CACHE_FETCH_POLICY`: `deduplicate` or `overlap` (default: deduplicate)
    /// - `CACHE_EVENT_CAPACITY`: Notification channel capacity (default: 64)
    /// - `TRACK_API_BASE_URL`: Base URL for the Track API
    /// - `TRACK_API_TOKEN`: Bearer token for the Track API
    /// - `REQUEST_TIMEOUT`: HTTP timeout in seconds (default: 10)
    /// - `LOG_LEVEL`: Logging level (default: "info")
    pub fn from_env() -> ConfigResult<Self> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();

        let cache_ttl_secs = Self::parse_env_positive("CACHE_TTL_SECONDS", 300)?;

        let ttl_overrides = match env::var("CACHE_TTL_OVERRIDES") {
            Ok(raw) => Self::parse_ttl_overrides(&raw)?,
            Err(_) => HashMap::new(),
        };

        let fetch_policy = match env::var("CACHE_FETCH_POLICY") {
            Ok(raw) => raw
                .parse::<FetchPolicy>()
                .map_err(|reason| ConfigError::InvalidValue {
                    var: "CACHE_FETCH_POLICY".to_string(),
                    reason,
                })?,
            Err(_) => FetchPolicy::default(),
        };

        let event_capacity = Self::parse_env_usize("CACHE_EVENT_CAPACITY", 64)?;
        if event_capacity == 0 {
            return Err(zero_value("CACHE_EVENT_CAPACITY"));
        }

        let api_base_url = match env::var("TRACK_API_BASE_URL") {
            Ok(url) if url.trim().is_empty() => None,
            Ok(url) => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ConfigError::InvalidValue {
                        var: "TRACK_API_BASE_URL".to_string(),
                        reason: "Must start with http:// or https://".to_string(),
                    });
                }
                Some(url.trim_end_matches('/').to_string())
            }
            Err(_) => None,
        };

        let api_token = env::var("TRACK_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        let request_timeout = Self::parse_env_positive("REQUEST_TIMEOUT", 10)?;
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Config {
            cache_ttl_secs,
            ttl_overrides,
            fetch_policy,
            event_capacity,
            api_base_url,
            api_token,
            request_timeout,
            log_level,
        })
    }

    /// Default TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Base URL of the Track API, or an error naming the missing variable.
    pub fn require_api_base_url(&self) -> ConfigResult<&str> {
        self.api_base_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVar("TRACK_API_BASE_URL".to_string()))
    }

    /// Parse `resource=seconds[,resource=seconds...]`.
    fn parse_ttl_overrides(raw: &str) -> ConfigResult<HashMap<Resource, Duration>> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            var: "CACHE_TTL_OVERRIDES".to_string(),
            reason,
        };

        let mut overrides = HashMap::new();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, secs) = pair
                .split_once('=')
                .ok_or_else(|| invalid(format!("Expected resource=seconds, got: {}", pair)))?;
            let resource: Resource = name.parse().map_err(|e| invalid(format!("{}", e)))?;
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| invalid(format!("Must be a positive number, got: {}", secs)))?;
            if secs == 0 {
                return Err(invalid(format!("TTL for {} must be greater than zero", resource)));
            }
            overrides.insert(resource, Duration::from_secs(secs));
        }
        Ok(overrides)
    }

    /// Parse an environment variable as u64 with a default value.
    fn parse_env_u64(var_name: &str, default: u64) -> ConfigResult<u64> {
        match env::var(var_name) {
            Ok(val) => val.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                var: var_name.to_string(),
                reason: format!("Must be a positive number, got: {}", val),
            }),
            Err(_) => Ok(default),
        }
    }

    /// Like [`parse_env_u64`](Self::parse_env_u64), rejecting zero.
    fn parse_env_positive(var_name: &str, default: u64) -> ConfigResult<u64> {
        match Self::parse_env_u64(var_name, default)? {
            0 => Err(zero_value(var_name)),
            value => Ok(value),
        }
    }

    /// Parse an environment variable as usize with a default value.
    fn parse_env_usize(var_name: &str, default: usize) -> ConfigResult<usize> {
        match env::var(var_name) {
            Ok(val) => val
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue {
                    var: var_name.to_string(),
                    reason: format!("Must be a positive number, got: {}", val),
                }),
            Err(_) => Ok(default),
        }
    }
}

fn zero_value(var_name: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var: var_name.to_string(),
        reason: "Must be greater than zero".to_string(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cache_ttl_secs: 300,
            ttl_overrides: HashMap::new(),
            fetch_policy: FetchPolicy::Deduplicate,
            event_capacity: 64,
            api_base_url: None,
            api_token: None,
            request_timeout: 10,
            log_level: "info".to_string(),
        }
    }
}
