//! Application service layer.
//!
//! Services orchestrate the cache and the data sources behind it. UI
//! bindings depend on [`ResourceService`] rather than on a global cache.

mod resource_cache;

pub use resource_cache::{ResourceCache, ResourceService};
