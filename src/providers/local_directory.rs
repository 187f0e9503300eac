//! Repository directory backed by a local hosting root
//!
//! Every subdirectory of `{root}/{creator}/` is one hosted repository. A
//! repository counts as a published web project when it has an entry page.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{ENTRY_PAGE, next_free_name};
use crate::core::naming;
use crate::core::traits::{RepositoryCandidate, RepositoryDirectory};

pub struct LocalRepositoryDirectory {
    root: PathBuf,
    creator_handle: String,
    domain: String,
}

impl LocalRepositoryDirectory {
    pub fn new<P: AsRef<Path>>(root: P, creator_handle: &str, domain: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            creator_handle: creator_handle.to_string(),
            domain: domain.to_string(),
        }
    }

    /// Directory holding the creator's repositories
    pub fn account_dir(&self) -> PathBuf {
        self.root.join(&self.creator_handle)
    }

    async fn candidate(&self, path: &Path, name: String) -> Result<RepositoryCandidate> {
        let metadata = fs::metadata(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let is_recognized_project_type = fs::try_exists(path.join(ENTRY_PAGE))
            .await
            .unwrap_or(false);

        Ok(RepositoryCandidate {
            live_url: is_recognized_project_type
                .then(|| naming::display_url(&self.creator_handle, &self.domain, &name)),
            last_updated: metadata.modified().ok().map(DateTime::<Utc>::from),
            is_recognized_project_type,
            name,
        })
    }
}

#[async_trait]
impl RepositoryDirectory for LocalRepositoryDirectory {
    /// Related repositories, most recently updated first, at most `limit`
    async fn list_related(&self, base_name: &str, limit: usize) -> Result<Vec<RepositoryCandidate>> {
        let account_dir = self.account_dir();
        if !fs::try_exists(&account_dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&account_dir)
            .await
            .with_context(|| format!("listing {}", account_dir.display()))?;

        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !naming::is_related(base_name, &name) {
                continue;
            }
            candidates.push(self.candidate(&entry.path(), name).await?);
        }

        candidates.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        candidates.truncate(limit);

        Ok(candidates)
    }

    async fn generate_unique_name(&self, base_name: &str) -> String {
        next_free_name(&self.account_dir(), &self.sanitize_name(base_name))
    }
}
