//! Local collaborator implementations
//!
//! These make the publisher usable without a hosting service: builds run
//! through the whitelisted command executor, and a plain directory tree
//! (`{root}/{creator}/{name}/`) stands in for hosted repositories.

pub mod command_build;
pub mod directory_publisher;
pub mod identity;
pub mod local_directory;

pub use command_build::{CommandBuildProvider, PrebuiltBuildProvider};
pub use directory_publisher::DirectoryPublisher;
pub use identity::{EnvCredentialProvider, StaticIdentity};
pub use local_directory::LocalRepositoryDirectory;

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Entry page every web build must contain
pub const ENTRY_PAGE: &str = "index.html";

/// Fail unless `dir` looks like a web build
pub(crate) fn verify_web_build(dir: &Path) -> Result<()> {
    if !dir.join(ENTRY_PAGE).is_file() {
        bail!("build output {} has no {}", dir.display(), ENTRY_PAGE);
    }
    Ok(())
}

/// `base` if free under `parent`, else the first free `base-N`
pub(crate) fn next_free_name(parent: &Path, base: &str) -> String {
    if !parent.join(base).exists() {
        return base.to_string();
    }

    (1..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !parent.join(candidate).exists())
        .unwrap_or_else(|| base.to_string())
}

/// Recursively copy `src` into `dst`, returning the number of files copied
pub(crate) async fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    let src = src.to_path_buf();
    let dst = dst.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<usize> {
        let mut copied = 0;

        for entry in WalkDir::new(&src).follow_links(false) {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(&src)
                .context("walked outside the source directory")?;
            let target = dst.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)
                    .with_context(|| format!("creating {}", target.display()))?;
            } else if entry.file_type().is_file() {
                fs::copy(entry.path(), &target)
                    .with_context(|| format!("copying {}", entry.path().display()))?;
                copied += 1;
            }
        }

        Ok(copied)
    })
    .await?
}
