//! Durable local preferences
//!
//! Holds the "last published target" record. Both keys are written together
//! and cleared together; writes go through a temp file and a rename.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// Directory (under the project) holding publisher state
pub const STATE_DIR: &str = ".web-publisher";

const PREFERENCES_FILE: &str = "preferences.json";

pub const PUBLISHED_URL_KEY: &str = "PublishedURL";
pub const LAST_PROJECT_NAME_KEY: &str = "LastProjectName";

/// Last successful publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedRecord {
    pub published_url: String,
    pub last_project_name: String,
}

/// File-backed key-value preference store
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    file_path: PathBuf,
}

impl PreferenceStore {
    /// Store rooted at `{project_path}/.web-publisher/preferences.json`
    pub fn new<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            file_path: project_path
                .as_ref()
                .join(STATE_DIR)
                .join(PREFERENCES_FILE),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Read the last published record, if both keys are present
    pub async fn load_published(&self) -> Result<Option<PublishedRecord>, std::io::Error> {
        let values = self.read_all().await?;

        let url = values.get(PUBLISHED_URL_KEY).filter(|v| !v.is_empty());
        let name = values.get(LAST_PROJECT_NAME_KEY).filter(|v| !v.is_empty());

        Ok(match (url, name) {
            (Some(url), Some(name)) => Some(PublishedRecord {
                published_url: url.clone(),
                last_project_name: name.clone(),
            }),
            _ => None,
        })
    }

    /// Write both keys in one atomic update
    pub async fn save_published(&self, record: &PublishedRecord) -> Result<(), std::io::Error> {
        let mut values = self.read_for_update().await?;
        values.insert(PUBLISHED_URL_KEY.to_string(), record.published_url.clone());
        values.insert(
            LAST_PROJECT_NAME_KEY.to_string(),
            record.last_project_name.clone(),
        );

        self.write_all(&values).await
    }

    /// Remove both keys
    pub async fn clear_published(&self) -> Result<(), std::io::Error> {
        let mut values = self.read_for_update().await?;
        values.remove(PUBLISHED_URL_KEY);
        values.remove(LAST_PROJECT_NAME_KEY);

        if values.is_empty() {
            if self.file_path.exists() {
                fs::remove_file(&self.file_path).await?;
            }
            return Ok(());
        }

        self.write_all(&values).await
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, std::io::Error> {
        if !self.file_path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.file_path).await?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Current values for a rewrite; a corrupted file is replaced, not kept
    async fn read_for_update(&self) -> Result<BTreeMap<String, String>, std::io::Error> {
        match self.read_all().await {
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                warn!(path = %self.file_path.display(), error = %e, "overwriting corrupted preferences");
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    async fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(values)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_file = self.file_path.with_extension("json.tmp");
        fs::write(&temp_file, json).await?;
        fs::rename(&temp_file, &self.file_path).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record() -> PublishedRecord {
        PublishedRecord {
            published_url: "https://alice.example.com/mygame/".to_string(),
            last_project_name: "mygame".to_string(),
        }
    }

    #[tokio::test]
    async fn test_absent_initially() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(temp_dir.path());

        assert_eq!(store.load_published().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(temp_dir.path());

        store.save_published(&record()).await.unwrap();

        let loaded = PreferenceStore::new(temp_dir.path())
            .load_published()
            .await
            .unwrap();
        assert_eq!(loaded, Some(record()));
    }

    #[tokio::test]
    async fn test_keys_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(temp_dir.path());

        store.save_published(&record()).await.unwrap();

        let content = std::fs::read_to_string(store.file_path()).unwrap();
        assert!(content.contains("\"PublishedURL\""));
        assert!(content.contains("\"LastProjectName\""));
        assert!(!store.file_path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_clear_removes_both_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(temp_dir.path());

        store.save_published(&record()).await.unwrap();
        store.clear_published().await.unwrap();

        assert_eq!(store.load_published().await.unwrap(), None);
        assert!(!store.file_path().exists());
    }

    #[tokio::test]
    async fn test_clear_keeps_unrelated_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(temp_dir.path());

        std::fs::create_dir_all(store.file_path().parent().unwrap()).unwrap();
        std::fs::write(
            store.file_path(),
            r#"{"PublishedURL":"https://x/","LastProjectName":"x","Theme":"dark"}"#,
        )
        .unwrap();

        store.clear_published().await.unwrap();

        let content = std::fs::read_to_string(store.file_path()).unwrap();
        assert!(content.contains("Theme"));
        assert!(!content.contains("PublishedURL"));
    }

    #[tokio::test]
    async fn test_half_written_record_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(temp_dir.path());

        std::fs::create_dir_all(store.file_path().parent().unwrap()).unwrap();
        std::fs::write(store.file_path(), r#"{"PublishedURL":"https://x/"}"#).unwrap();

        assert_eq!(store.load_published().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupted_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(temp_dir.path());

        std::fs::create_dir_all(store.file_path().parent().unwrap()).unwrap();
        std::fs::write(store.file_path(), "not json").unwrap();

        let error = store.load_published().await.unwrap_err();
        assert_eq!(error.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_save_replaces_corrupted_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(temp_dir.path());

        std::fs::create_dir_all(store.file_path().parent().unwrap()).unwrap();
        std::fs::write(store.file_path(), "{ not json").unwrap();

        store.save_published(&record()).await.unwrap();

        assert_eq!(store.load_published().await.unwrap(), Some(record()));
    }

    #[tokio::test]
    async fn test_clear_removes_corrupted_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = PreferenceStore::new(temp_dir.path());

        std::fs::create_dir_all(store.file_path().parent().unwrap()).unwrap();
        std::fs::write(store.file_path(), "{ not json").unwrap();

        store.clear_published().await.unwrap();

        assert!(!store.file_path().exists());
        assert_eq!(store.load_published().await.unwrap(), None);
    }
}
