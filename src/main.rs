//! Track cache inspector - main entry point
//!
//! Builds the resource cache the way the application does, loads every
//! resource, records a sample write and prints the cache stats as JSON.
//! Logs go to stderr so stdout stays machine-readable.

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use track_data_cache::client::{HttpDataSource, TrackApiClient};
use track_data_cache::sources::{demo_fixtures, DataSource};
use track_data_cache::{CacheKey, Config, Resource, ResourceCache, ResourceService};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let fallback = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            cfg
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let source: Arc<dyn DataSource> = match &config.api_base_url {
        Some(url) => {
            info!("Reading from Track API at {}", url);
            Arc::new(HttpDataSource::new(TrackApiClient::new(&config)?))
        }
        None => {
            info!("TRACK_API_BASE_URL not set, using demo fixtures");
            Arc::new(demo_fixtures())
        }
    };

    let service = ResourceCache::from_config(&config, source);
    info!(
        "Cache TTL: {} seconds, policy: {:?}",
        config.cache_ttl_secs, config.fetch_policy
    );

    let mut events = service.subscribe();
    let watcher = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) if event.is_invalidation() => {
                    info!(key = %event.key, "Invalidated");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event watcher lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let keys: Vec<CacheKey> = Resource::ALL.into_iter().map(CacheKey::new).collect();

    for (key, result) in keys.iter().zip(service.load_many(&keys).await) {
        if let Err(e) = result {
            warn!(key = %key, "Initial load failed: {}", e);
        }
    }

    // Second pass is served from cache; failed keys are fetched again
    for (key, result) in keys.iter().zip(service.load_many(&keys).await) {
        if let Err(e) = result {
            warn!(key = %key, "Cached load failed: {}", e);
        }
    }

    service.record_write(Resource::TrainingPeriods);

    let report = json!({
        "stats": service.stats(),
        "metrics": service.metrics().summary(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    // Let the watcher drain queued events before exit
    tokio::task::yield_now().await;
    watcher.abort();

    info!("Inspection complete");
    Ok(())
}
