//! Core traits and types for web publishing
//!
//! This module defines the collaborator seams the orchestrator depends on:
//! identity, hosting credentials, the local build, the repository directory
//! and the artifact publisher.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::naming;

// ============================================================================
// Identity & Credentials
// ============================================================================

/// Identity/session provider for the current creator
pub trait IdentityProvider: Send + Sync {
    /// Whether a valid identity session exists
    fn is_authenticated(&self) -> bool;

    /// Reserved creator handle, used as the URL subdomain
    fn creator_handle(&self) -> Option<String>;

    /// Session token handed to the artifact publisher
    fn id_token(&self) -> Option<SecretString>;
}

/// Hosting credential provider
pub trait CredentialProvider: Send + Sync {
    fn has_valid_credential(&self) -> bool;
}

// ============================================================================
// Build
// ============================================================================

/// Result of a successful local build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub artifact_path: PathBuf,
}

/// Progress callback used by long-running collaborators
pub type ProgressFn = dyn Fn(String) + Send + Sync;

/// Produces a local build artifact from the current project
#[async_trait]
pub trait BuildProvider: Send + Sync {
    /// Build into `output_path`, reporting human-readable progress
    async fn build(
        &self,
        output_path: &Path,
        on_progress: &ProgressFn,
    ) -> anyhow::Result<BuildArtifact>;
}

// ============================================================================
// Repository Directory
// ============================================================================

/// Read-only projection of a hosted repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryCandidate {
    pub name: String,
    #[serde(rename = "isRecognizedProjectType")]
    pub is_recognized_project_type: bool,
    #[serde(rename = "liveUrl", skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
    #[serde(rename = "lastUpdated", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Lists existing hosted projects for the current account
#[async_trait]
pub trait RepositoryDirectory: Send + Sync {
    /// List repositories matching or related to `base_name`, at most `limit`
    async fn list_related(
        &self,
        base_name: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<RepositoryCandidate>>;

    /// Allocate a sanitized name for a new repository that is not taken yet
    async fn generate_unique_name(&self, base_name: &str) -> String;

    fn sanitize_name(&self, raw: &str) -> String {
        naming::sanitize_name(raw)
    }
}

// ============================================================================
// Artifact Publisher
// ============================================================================

/// Declared purpose of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentIntent {
    CreateNew,
    UpdateExisting,
}

impl DeploymentIntent {
    pub fn from_is_new(is_new: bool) -> Self {
        if is_new {
            Self::CreateNew
        } else {
            Self::UpdateExisting
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateNew => "create_new",
            Self::UpdateExisting => "update_existing",
        }
    }
}

impl std::fmt::Display for DeploymentIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload request handed to an [`ArtifactPublisher`]
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub artifact_path: PathBuf,
    pub creator_handle: String,
    pub target_name: String,
    pub intent: DeploymentIntent,
    pub id_token: Option<SecretString>,
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// Name the host actually used (may differ from the requested one)
    #[serde(rename = "actualTargetName")]
    pub actual_target_name: String,
    #[serde(rename = "liveUrl")]
    pub live_url: String,
}

/// Uploads a build artifact to a hosting location
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    async fn upload(
        &self,
        request: UploadRequest,
        on_progress: &ProgressFn,
    ) -> anyhow::Result<UploadOutcome>;

    /// Release transport resources. Called after every upload, success or not.
    async fn release(&self) {}
}
