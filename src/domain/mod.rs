//! Domain value objects and types.
//!
//! Type-safe building blocks for cache keys: the resources the API serves,
//! validated entity IDs, and the structured [`CacheKey`] that replaces
//! ad-hoc string concatenation at call sites.

pub mod cache_key;
pub mod entity_id;
pub mod errors;
pub mod resource;

pub use cache_key::CacheKey;
pub use entity_id::EntityId;
pub use errors::ValidationError;
pub use resource::Resource;
