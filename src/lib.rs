//! Track Data Cache - client-side data cache for a track-and-field
//! athlete/coach management application.
//!
//! List views (meets, practices, measurables, training periods, programs,
//! event assignments) read through a TTL cache so repeated visits do not
//! re-query the API, and writes invalidate every affected view.
//!
//! # Architecture
//!
//! - **cache**: generic `DataCache` with freshness windows, invalidation,
//!   loading flags, change notifications and stats
//! - **domain**: resources and structured cache keys
//! - **sources**: the `DataSource` seam and an in-memory fixture source
//! - **client**: HTTP client for the Track API and its async data source
//! - **services**: `ResourceCache`, the cache bound to a data source
//! - **observability**: hit/miss metrics and timers
//! - **config**: configuration from environment variables
//! - **error**: error types

pub mod cache;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod observability;
pub mod services;
pub mod sources;

pub use cache::{CacheEntry, CacheEvent, CacheEventKind, CacheStats, DataCache, FetchPolicy, KeyStats, Origin};
pub use client::{HttpDataSource, TrackApiClient};
pub use config::Config;
pub use domain::{CacheKey, EntityId, Resource, ValidationError};
pub use error::{ConfigError, SourceError};
pub use observability::{CacheMetrics, MetricsSummary};
pub use services::{ResourceCache, ResourceService};
pub use sources::{DataSource, StaticDataSource};
