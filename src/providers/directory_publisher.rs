//! Artifact publisher that copies builds into a local hosting root

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{copy_tree, next_free_name, verify_web_build};
use crate::core::naming;
use crate::core::traits::{
    ArtifactPublisher, DeploymentIntent, ProgressFn, UploadOutcome, UploadRequest,
};

/// Publishes to `{root}/{creator}/{name}/`
pub struct DirectoryPublisher {
    root: PathBuf,
    domain: String,
}

impl DirectoryPublisher {
    pub fn new<P: AsRef<Path>>(root: P, domain: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            domain: domain.to_string(),
        }
    }
}

#[async_trait]
impl ArtifactPublisher for DirectoryPublisher {
    async fn upload(&self, request: UploadRequest, on_progress: &ProgressFn) -> Result<UploadOutcome> {
        verify_web_build(&request.artifact_path)?;

        let account_dir = self.root.join(&request.creator_handle);
        fs::create_dir_all(&account_dir)
            .await
            .with_context(|| format!("creating {}", account_dir.display()))?;

        let requested = naming::sanitize_name(&request.target_name);
        let name = match request.intent {
            // Never overwrite someone else's site when creating
            DeploymentIntent::CreateNew => next_free_name(&account_dir, &requested),
            DeploymentIntent::UpdateExisting => requested,
        };
        let destination = account_dir.join(&name);

        if request.intent == DeploymentIntent::CreateNew
            && fs::try_exists(&destination).await.unwrap_or(false)
        {
            bail!("target {} already exists", name);
        }

        on_progress(format!("Uploading to {}", name));
        let copied = replace_contents(&request.artifact_path, &destination).await?;
        on_progress(format!("Uploaded {} files", copied));

        let live_url = naming::display_url(&request.creator_handle, &self.domain, &name);
        info!(target = %name, files = copied, intent = %request.intent, url = %live_url, "artifact published");

        Ok(UploadOutcome {
            actual_target_name: name,
            live_url,
        })
    }
}

/// Copy `artifact` beside `destination`, then swap it into place
///
/// The live directory is left as it was unless the copy finished.
async fn replace_contents(artifact: &Path, destination: &Path) -> Result<usize> {
    let parent = destination
        .parent()
        .with_context(|| format!("{} has no parent directory", destination.display()))?;
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = Uuid::new_v4().simple();
    let staging = parent.join(format!(".{}.staging-{}", name, suffix));
    let previous = parent.join(format!(".{}.previous-{}", name, suffix));

    let copied = match copy_tree(artifact, &staging).await {
        Ok(copied) => copied,
        Err(e) => {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e);
        }
    };

    let replacing = fs::try_exists(destination).await.unwrap_or(false);
    if replacing {
        debug!(target = %name, "replacing existing contents");
        if let Err(e) = fs::rename(destination, &previous).await {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e).with_context(|| format!("moving aside {}", destination.display()));
        }
    }

    if let Err(e) = fs::rename(&staging, destination).await {
        if replacing {
            let _ = fs::rename(&previous, destination).await;
        }
        let _ = fs::remove_dir_all(&staging).await;
        return Err(e).with_context(|| format!("moving build into {}", destination.display()));
    }

    if replacing && let Err(e) = fs::remove_dir_all(&previous).await {
        warn!(path = %previous.display(), error = %e, "could not remove replaced contents");
    }

    Ok(copied)
}
