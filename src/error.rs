//! Error types for the track data cache.
//!
//! This module defines custom error types using `thiserror` for precise error handling.
//! The cache itself never fails; these cover the data sources behind it and
//! configuration loading.

use thiserror::Error;

/// Errors that can occur when fetching data from a source of record.
#[derive(Error, Debug)]
pub enum SourceError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse JSON response
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Network timeout
    #[error("Request timeout")]
    Timeout,

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Authentication failed
    #[error("Authentication failed")]
    Unauthorized,

    /// The task running the fetch panicked or was cancelled
    #[error("Fetch task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    /// Generic source error with context
    #[error("Source error: {0}")]
    Other(String),
}

impl SourceError {
    /// Whether retrying the same request later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpError(_) | Self::Timeout => true,
            Self::ApiError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is missing
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    /// Environment variable has invalid value
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Other(String),
}

/// Convenience type alias for Results with SourceError
pub type SourceResult<T> = Result<T, SourceError>;

/// Convenience type alias for Results with ConfigError
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_task_is_not_transient() {
        let join_error = tokio::spawn(async { panic!("fetch panicked") })
            .await
            .unwrap_err();
        let err = SourceError::from(join_error);

        assert!(matches!(err, SourceError::TaskFailed(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = SourceError::NotFound("practices".to_string());
        assert_eq!(err.to_string(), "Resource not found: practices");

        let err = ConfigError::MissingVar("TRACK_API_BASE_URL".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: TRACK_API_BASE_URL"
        );

        let err = ConfigError::InvalidValue {
            var: "CACHE_TTL_SECONDS".to_string(),
            reason: "Must be a positive number".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value for CACHE_TTL_SECONDS: Must be a positive number"
        );
    }

    #[test]
    fn test_api_error_variants() {
        let err = SourceError::ApiError {
            status: 404,
            message: "Not found".to_string(),
        };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("Not found"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(SourceError::Timeout.is_transient());
        assert!(SourceError::HttpError("reset".to_string()).is_transient());
        assert!(SourceError::ApiError {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!SourceError::ApiError {
            status: 400,
            message: String::new()
        }
        .is_transient());
        assert!(!SourceError::Unauthorized.is_transient());
        assert!(!SourceError::NotFound("x".to_string()).is_transient());
    }
}
