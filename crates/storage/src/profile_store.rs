use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pipeline::{ProfileStore, StoreError, TaxonomyProfile};
use tracing::debug;

use crate::{io_error, serde_error};

/// Stores the taxonomy profile as a JSON file.
///
/// Saves write a sibling temporary file and rename it over the target, so a
/// reader never sees a half-written document.
#[derive(Debug, Clone)]
pub struct JsonFileProfileStore {
    path: PathBuf,
}

impl JsonFileProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ProfileStore for JsonFileProfileStore {
    async fn load(&self) -> Result<Option<TaxonomyProfile>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&self.path, e)),
        };
        let profile = serde_json::from_slice(&bytes).map_err(serde_error)?;
        debug!(path = %self.path.display(), "taxonomy profile loaded");
        Ok(Some(profile))
    }

    async fn save(&self, profile: &TaxonomyProfile) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(profile).map_err(serde_error)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| io_error(&temp, e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;

        debug!(path = %self.path.display(), "taxonomy profile saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::Timestamp;

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileProfileStore::new(dir.path().join("profile.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_profile_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileProfileStore::new(dir.path().join("nested").join("profile.json"));

        let mut profile = TaxonomyProfile::new(Timestamp::now());
        profile.learn(&["Salud".into()], &["Vacunas".into()], 0.9, Timestamp::now());
        store.save(&profile).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, profile);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileProfileStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization { .. }));
    }
}
