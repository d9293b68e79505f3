//! Structured cache keys.
//!
//! Keys are a [`Resource`] plus an optional set of named scope
//! discriminants (`coach`, `athlete`, `period`, ...). The scope is kept in a
//! sorted map, so two keys built with the same discriminants in a different
//! order are equal, hash the same and render the same.

use super::entity_id::EntityId;
use super::errors::ValidationError;
use super::resource::Resource;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of one cached view of a resource.
///
/// # Example
///
/// ```
/// use track_data_cache::domain::{CacheKey, EntityId, Resource};
///
/// let key = CacheKey::new(Resource::Practices)
///     .try_with("period", "p3")?
///     .with("athlete", EntityId::new("a1")?)?;
/// assert_eq!(key.to_string(), "practices[athlete=a1,period=p3]");
/// assert_eq!(key.to_string().parse::<CacheKey>()?, key);
/// # Ok::<(), track_data_cache::ValidationError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    resource: Resource,
    scope: BTreeMap<String, EntityId>,
}

impl CacheKey {
    /// Unscoped key covering the whole collection.
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            scope: BTreeMap::new(),
        }
    }

    /// Add (or replace) a scope discriminant.
    ///
    /// Fails if `name` is empty or whitespace.
    pub fn with(mut self, name: impl Into<String>, id: EntityId) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyScopeName);
        }
        self.scope.insert(name, id);
        Ok(self)
    }

    /// Like [`with`](Self::with) but validates a raw ID first.
    pub fn try_with(
        self,
        name: impl Into<String>,
        id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        self.with(name, EntityId::new(id)?)
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Value of a scope discriminant, if present.
    pub fn scope(&self, name: &str) -> Option<&EntityId> {
        self.scope.get(name)
    }

    /// Scope discriminants in sorted order.
    pub fn scope_entries(&self) -> impl Iterator<Item = (&str, &EntityId)> {
        self.scope.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_scoped(&self) -> bool {
        !self.scope.is_empty()
    }
}

impl From<Resource> for CacheKey {
    fn from(resource: Resource) -> Self {
        CacheKey::new(resource)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource)?;
        if self.scope.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (i, (name, id)) in self.scope.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(
                f,
                "{}={}",
                urlencoding::encode(name),
                urlencoding::encode(id.as_str())
            )?;
        }
        f.write_str("]")
    }
}

impl FromStr for CacheKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedKey(s.to_string());

        let Some(open) = s.find('[') else {
            return Ok(CacheKey::new(s.parse()?));
        };

        let resource: Resource = s[..open].parse()?;
        let body = s[open + 1..].strip_suffix(']').ok_or_else(malformed)?;
        if body.is_empty() {
            return Err(malformed());
        }

        let mut key = CacheKey::new(resource);
        for pair in body.split(',') {
            let (name, value) = pair.split_once('=').ok_or_else(malformed)?;
            let name = urlencoding::decode(name).map_err(|_| malformed())?;
            let value = urlencoding::decode(value).map_err(|_| malformed())?;
            key = key.try_with(name.into_owned(), value.into_owned())?;
        }
        Ok(key)
    }
}

impl Serialize for CacheKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CacheKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
