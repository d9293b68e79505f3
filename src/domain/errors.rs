//! Domain validation errors.

use std::fmt;

/// Errors that can occur while building or parsing cache keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided ID is empty.
    EmptyId,

    /// A scope discriminant has an empty or whitespace-only name.
    EmptyScopeName,

    /// The resource name is not one the application knows about.
    UnknownResource(String),

    /// A textual cache key could not be parsed.
    MalformedKey(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "ID cannot be empty"),
            Self::EmptyScopeName => write!(f, "Scope name cannot be empty"),
            Self::UnknownResource(name) => write!(f, "Unknown resource: {}", name),
            Self::MalformedKey(key) => write!(f, "Malformed cache key: {}", key),
        }
    }
}

impl std::error::Error for ValidationError {}
