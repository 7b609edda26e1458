//! JSON file storage implementation.
//!
//! Stores one JSON file per feature under a board directory. Snapshot
//! history, if desired, is expected to come from the project's own Git
//! repository; this backend does not version objects itself.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use agentboard_core::{Feature, FeatureFilter, FeatureId, FeaturePatch};

use super::{FeatureStore, Result, StoreError};

/// File-based JSON storage backend.
pub struct JsonFeatureStore {
    root: PathBuf,
}

impl JsonFeatureStore {
    /// Create storage rooted at `root`, creating the directory tree if
    /// needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("features")).await?;
        Ok(Self { root })
    }

    fn feature_path(&self, id: FeatureId) -> PathBuf {
        self.root.join("features").join(format!("{}.json", id))
    }
}

#[async_trait::async_trait]
impl FeatureStore for JsonFeatureStore {
    async fn save_feature(&mut self, feature: &Feature) -> Result<()> {
        let path = self.feature_path(feature.id);
        let json = serde_json::to_string_pretty(feature)?;
        fs::write(&path, json.as_bytes()).await?;
        debug!("Saved feature {} to {}", feature.id, path.display());
        Ok(())
    }

    async fn load_feature(&self, id: FeatureId) -> Result<Option<Feature>> {
        read_json(&self.feature_path(id)).await
    }

    async fn list_features(&self, filter: &FeatureFilter) -> Result<Vec<Feature>> {
        let mut features: Vec<Feature> = list_dir(&self.root.join("features")).await?;
        features.retain(|f| super::trait_::matches_filter(f, filter));
        // Directory iteration order is arbitrary; keep snapshots stable.
        features.sort_by_key(|f| f.id);
        Ok(features)
    }

    async fn update_feature(&mut self, id: FeatureId, patch: FeaturePatch) -> Result<()> {
        let mut feature = self
            .load_feature(id)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        feature.apply(patch);
        self.save_feature(&feature).await
    }

    async fn delete_feature(&mut self, id: FeatureId) -> Result<()> {
        fs::remove_file(self.feature_path(id)).await.or_else(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Ok(())
            } else {
                Err(e)
            }
        })?;
        Ok(())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Ok(Some(item)) = read_json(&entry.path()).await {
            items.push(item);
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentboard_core::FeatureStatus;

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFeatureStore::new(dir.path()).await.unwrap();

        let feature = Feature::new("login", "Add login form").with_branch("main");
        store.save_feature(&feature).await.unwrap();

        let loaded = store.load_feature(feature.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, feature.id);
        assert_eq!(loaded.title, "login");
        assert_eq!(loaded.branch_name.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFeatureStore::new(dir.path()).await.unwrap();
        assert!(store.load_feature(FeatureId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_respects_status_filter() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFeatureStore::new(dir.path()).await.unwrap();

        let backlog = Feature::new("a", "a");
        let mut done = Feature::new("b", "b");
        done.status = FeatureStatus::Completed;
        store.save_feature(&backlog).await.unwrap();
        store.save_feature(&done).await.unwrap();

        let filter = FeatureFilter {
            status: Some(vec![FeatureStatus::Backlog]),
            ..Default::default()
        };
        let features = store.list_features(&filter).await.unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, backlog.id);
    }

    #[tokio::test]
    async fn update_patches_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFeatureStore::new(dir.path()).await.unwrap();

        let feature = Feature::new("a", "a");
        store.save_feature(&feature).await.unwrap();

        store
            .update_feature(feature.id, FeaturePatch::branch("feature/x"))
            .await
            .unwrap();

        let loaded = store.load_feature(feature.id).await.unwrap().unwrap();
        assert_eq!(loaded.branch_name.as_deref(), Some("feature/x"));
        assert_eq!(loaded.status, FeatureStatus::Backlog);
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFeatureStore::new(dir.path()).await.unwrap();

        let err = store
            .update_feature(FeatureId::new(), FeaturePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFeatureStore::new(dir.path()).await.unwrap();

        let feature = Feature::new("a", "a");
        store.save_feature(&feature).await.unwrap();
        store.delete_feature(feature.id).await.unwrap();
        store.delete_feature(feature.id).await.unwrap();
        assert!(store.load_feature(feature.id).await.unwrap().is_none());
    }
}
