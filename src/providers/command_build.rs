//! Local build providers
//!
//! [`CommandBuildProvider`] runs a whitelisted build tool with the output
//! directory passed both as a `{output}` argument placeholder and as the
//! `PUBLISH_OUTPUT_DIR` environment variable. [`PrebuiltBuildProvider`]
//! publishes a directory that was built beforehand.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use super::{copy_tree, verify_web_build};
use crate::core::config::DEFAULT_BUILD_TIMEOUT_SECS;
use crate::core::traits::{BuildArtifact, BuildProvider, ProgressFn};
use crate::security::{SafeCommandExecutor, SecureTokenManager};

/// Environment variable holding the build output directory
pub const OUTPUT_DIR_ENV: &str = "PUBLISH_OUTPUT_DIR";

const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Lines of stderr kept in a build failure message
const STDERR_TAIL_LINES: usize = 20;

/// Runs a build command in the project directory
pub struct CommandBuildProvider {
    project_path: PathBuf,
    command: String,
    args: Vec<String>,
    timeout: Duration,
    extra_allowed: Vec<String>,
    tokens: SecureTokenManager,
}

impl CommandBuildProvider {
    pub fn new<P: AsRef<Path>>(project_path: P, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
            command: command.into(),
            args,
            timeout: Duration::from_secs(DEFAULT_BUILD_TIMEOUT_SECS),
            extra_allowed: Vec::new(),
            tokens: SecureTokenManager::new(),
        }
    }

    /// Tokens masked out of build failure output
    pub fn with_tokens(mut self, tokens: SecureTokenManager) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Permit a command outside the built-in whitelist
    pub fn allow(mut self, command: impl Into<String>) -> Self {
        self.extra_allowed.push(command.into());
        self
    }

    fn expand_args(&self, output_path: &Path) -> Vec<String> {
        let output = output_path.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output))
            .collect()
    }
}

#[async_trait]
impl BuildProvider for CommandBuildProvider {
    async fn build(&self, output_path: &Path, on_progress: &ProgressFn) -> Result<BuildArtifact> {
        fs::create_dir_all(output_path)
            .await
            .with_context(|| format!("creating {}", output_path.display()))?;

        let mut executor = SafeCommandExecutor::new(&self.project_path)?;
        executor.set_timeout(self.timeout);
        executor.env(OUTPUT_DIR_ENV, output_path.to_string_lossy());
        for command in &self.extra_allowed {
            executor.allow(command.clone());
        }

        let args = self.expand_args(output_path);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        on_progress(format!("Running {} {}", self.command, args.join(" ")));
        debug!(command = %self.command, args = ?args, "starting build");

        let output = executor.execute(&self.command, &arg_refs).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            let tail = self.tokens.mask_tokens_in_string(&tail);
            bail!("{} exited with {}\n{}", self.command, output.status, tail);
        }

        verify_web_build(output_path)?;
        on_progress("Build complete".to_string());

        Ok(BuildArtifact {
            artifact_path: output_path.to_path_buf(),
        })
    }
}

/// Publishes an already-built web directory
pub struct PrebuiltBuildProvider {
    source_dir: PathBuf,
}

impl PrebuiltBuildProvider {
    pub fn new<P: AsRef<Path>>(source_dir: P) -> Self {
        Self {
            source_dir: source_dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl BuildProvider for PrebuiltBuildProvider {
    async fn build(&self, output_path: &Path, on_progress: &ProgressFn) -> Result<BuildArtifact> {
        if !self.source_dir.is_dir() {
            bail!("source directory {} does not exist", self.source_dir.display());
        }
        verify_web_build(&self.source_dir)?;

        on_progress(format!("Copying {}", self.source_dir.display()));
        let copied = copy_tree(&self.source_dir, output_path).await?;
        on_progress(format!("Copied {} files", copied));

        Ok(BuildArtifact {
            artifact_path: output_path.to_path_buf(),
        })
    }
}
