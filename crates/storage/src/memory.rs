//! In-memory storage implementation, for tests and demos.

use std::collections::BTreeMap;

use agentboard_core::{Feature, FeatureFilter, FeatureId, FeaturePatch};

use super::{FeatureStore, Result, StoreError};

/// In-memory storage backend. Not persistent; iteration order follows ids.
#[derive(Debug, Default)]
pub struct MemoryFeatureStore {
    features: BTreeMap<FeatureId, Feature>,
}

impl MemoryFeatureStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with features.
    pub fn with_features(features: impl IntoIterator<Item = Feature>) -> Self {
        Self {
            features: features.into_iter().map(|f| (f.id, f)).collect(),
        }
    }
}

#[async_trait::async_trait]
impl FeatureStore for MemoryFeatureStore {
    async fn save_feature(&mut self, feature: &Feature) -> Result<()> {
        self.features.insert(feature.id, feature.clone());
        Ok(())
    }

    async fn load_feature(&self, id: FeatureId) -> Result<Option<Feature>> {
        Ok(self.features.get(&id).cloned())
    }

    async fn list_features(&self, filter: &FeatureFilter) -> Result<Vec<Feature>> {
        Ok(self
            .features
            .values()
            .filter(|f| super::trait_::matches_filter(f, filter))
            .cloned()
            .collect())
    }

    async fn update_feature(&mut self, id: FeatureId, patch: FeaturePatch) -> Result<()> {
        let feature = self.features.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        feature.apply(patch);
        Ok(())
    }

    async fn delete_feature(&mut self, id: FeatureId) -> Result<()> {
        self.features.remove(&id);
        Ok(())
    }
}
