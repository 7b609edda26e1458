//! Storage trait abstraction.

use async_trait::async_trait;

use agentboard_core::{Feature, FeatureFilter, FeatureId, FeaturePatch};

/// Error type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Feature not found
    #[error("Feature not found: {0}")]
    NotFound(FeatureId),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Storage abstraction for feature cards.
///
/// This trait allows different storage backends to be plugged in.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Save a feature (create or update).
    async fn save_feature(&mut self, feature: &Feature) -> Result<()>;

    /// Load a feature by ID.
    async fn load_feature(&self, id: FeatureId) -> Result<Option<Feature>>;

    /// List features matching the filter.
    async fn list_features(&self, filter: &FeatureFilter) -> Result<Vec<Feature>>;

    /// Apply a partial update to a feature.
    async fn update_feature(&mut self, id: FeatureId, patch: FeaturePatch) -> Result<()>;

    /// Delete a feature.
    async fn delete_feature(&mut self, id: FeatureId) -> Result<()>;
}

pub(crate) fn matches_filter(feature: &Feature, filter: &FeatureFilter) -> bool {
    if let Some(statuses) = &filter.status {
        if !statuses.contains(&feature.status) {
            return false;
        }
    }
    if let Some(branch) = &filter.branch_name {
        if feature.branch_name.as_deref() != Some(branch.as_str()) {
            return false;
        }
    }
    true
}
