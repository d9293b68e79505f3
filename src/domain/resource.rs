//! Resources served by the track-and-field API.

use super::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A logical collection in the source of record.
///
/// Each variant maps to one REST collection and to the first component of a
/// [`CacheKey`](super::CacheKey).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Meets,
    Practices,
    Measurables,
    TrainingPeriods,
    Programs,
    EventAssignments,
    Athletes,
    Events,
}

impl Resource {
    /// Every resource, in declaration order.
    pub const ALL: [Resource; 8] = [
        Resource::Meets,
        Resource::Practices,
        Resource::Measurables,
        Resource::TrainingPeriods,
        Resource::Programs,
        Resource::EventAssignments,
        Resource::Athletes,
        Resource::Events,
    ];

    /// Stable snake_case name used in keys, config and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meets => "meets",
            Self::Practices => "practices",
            Self::Measurables => "measurables",
            Self::TrainingPeriods => "training_periods",
            Self::Programs => "programs",
            Self::EventAssignments => "event_assignments",
            Self::Athletes => "athletes",
            Self::Events => "events",
        }
    }

    /// URL path segment of the REST collection.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Meets => "meets",
            Self::Practices => "practices",
            Self::Measurables => "measurables",
            Self::TrainingPeriods => "training-periods",
            Self::Programs => "programs",
            Self::EventAssignments => "event-assignments",
            Self::Athletes => "athletes",
            Self::Events => "events",
        }
    }

    /// Resources whose cached views embed or are filtered by this one.
    ///
    /// A write to `self` must invalidate these in addition to `self`.
    pub fn dependents(&self) -> &'static [Resource] {
        match self {
            Self::TrainingPeriods => &[Resource::Practices, Resource::Programs],
            Self::Events => &[Resource::EventAssignments, Resource::Meets],
            Self::Athletes => &[Resource::EventAssignments, Resource::Measurables],
            Self::Meets => &[Resource::EventAssignments],
            Self::Practices
            | Self::Measurables
            | Self::Programs
            | Self::EventAssignments => &[],
        }
    }

    /// `self` followed by its dependents.
    pub fn invalidation_set(&self) -> Vec<Resource> {
        let mut set = vec![*self];
        set.extend_from_slice(self.dependents());
        set
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = ValidationError;

    /// Accepts the snake_case name or the URL path form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Resource::ALL
            .iter()
            .find(|r| r.as_str() == needle || r.path() == needle)
            .copied()
            .ok_or_else(|| ValidationError::UnknownResource(s.to_string()))
    }
}
