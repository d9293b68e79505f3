//! Data sources behind the cache.
//!
//! [`DataSource`] abstracts the source of record so the cache service can
//! be wired to the HTTP API, to fixtures, or to a test double.

mod static_source;
mod traits;

pub use static_source::{demo_fixtures, StaticDataSource};
pub use traits::DataSource;
