//! Unique identifiers for agentboard entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a Feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureId(Ulid);

impl FeatureId {
    /// Generate a new FeatureId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for FeatureId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for FeatureId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
