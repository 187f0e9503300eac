//! Configuration structures and types for web-publisher
//!
//! This module provides type-safe configuration management with serde support.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Domain used when none is configured
pub const DEFAULT_DOMAIN: &str = "example.com";

/// Default number of repositories fetched when resolving targets
pub const DEFAULT_DIRECTORY_LIMIT: usize = 50;

/// Default build output directory, relative to the project
pub const DEFAULT_OUTPUT_DIR: &str = "builds";

/// Default build timeout in seconds
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 1800;

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublisherConfig {
    /// Schema version (required)
    pub version: String,

    /// Extend from base configuration file (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Variable definitions (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<HashMap<String, String>>,

    /// Project information (optional, name defaults to the directory name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectConfig>,

    /// Hosting settings (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosting: Option<HostingConfig>,

    /// Creator identity (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityConfig>,

    /// Local build settings (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfig>,

    /// Repository directory settings (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<DirectoryConfig>,
}

/// Project basic information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProjectConfig {
    /// Base name used to derive the target name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Hosting configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HostingConfig {
    /// Domain under which `https://{creator}.{domain}/{name}/` is served
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Local directory acting as the hosting root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Creator identity configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IdentityConfig {
    /// Reserved creator handle
    #[serde(skip_serializing_if = "Option::is_none", rename = "creatorHandle")]
    pub creator_handle: Option<String>,
}

/// Local build configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BuildConfig {
    /// Build command (must be on the allowed list)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Build command arguments; `{output}` is replaced with the output path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    /// Already-built directory to publish when no command is set
    #[serde(skip_serializing_if = "Option::is_none", rename = "sourceDir")]
    pub source_dir: Option<PathBuf>,

    /// Where timestamped builds are written (default: "builds")
    #[serde(skip_serializing_if = "Option::is_none", rename = "outputDir")]
    pub output_dir: Option<PathBuf>,

    /// Build timeout in seconds (default: 1800)
    #[serde(skip_serializing_if = "Option::is_none", rename = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

/// Repository directory configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DirectoryConfig {
    /// Maximum repositories fetched (default: 50)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Default configuration values
impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            extends: None,
            variables: None,
            project: None,
            hosting: Some(HostingConfig {
                domain: Some(DEFAULT_DOMAIN.to_string()),
                root: None,
            }),
            identity: None,
            build: Some(BuildConfig {
                output_dir: Some(PathBuf::from(DEFAULT_OUTPUT_DIR)),
                timeout_secs: Some(DEFAULT_BUILD_TIMEOUT_SECS),
                ..Default::default()
            }),
            directory: Some(DirectoryConfig {
                limit: Some(DEFAULT_DIRECTORY_LIMIT),
            }),
        }
    }
}

impl PublisherConfig {
    pub fn project_name(&self) -> Option<&str> {
        self.project.as_ref()?.name.as_deref()
    }

    pub fn domain(&self) -> &str {
        self.hosting
            .as_ref()
            .and_then(|h| h.domain.as_deref())
            .unwrap_or(DEFAULT_DOMAIN)
    }

    pub fn hosting_root(&self) -> Option<&PathBuf> {
        self.hosting.as_ref()?.root.as_ref()
    }

    pub fn creator_handle(&self) -> Option<&str> {
        self.identity.as_ref()?.creator_handle.as_deref()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.build
            .as_ref()
            .and_then(|b| b.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    pub fn build_timeout_secs(&self) -> u64 {
        self.build
            .as_ref()
            .and_then(|b| b.timeout_secs)
            .unwrap_or(DEFAULT_BUILD_TIMEOUT_SECS)
    }

    pub fn directory_limit(&self) -> usize {
        self.directory
            .as_ref()
            .and_then(|d| d.limit)
            .unwrap_or(DEFAULT_DIRECTORY_LIMIT)
    }
}
