//! Mock collaborators shared by orchestration tests

use async_trait::async_trait;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

use super::publish_orchestrator::{Collaborators, PublishOrchestrator};
use crate::core::config::{IdentityConfig, ProjectConfig, PublisherConfig};
use crate::core::traits::*;

pub struct MockIdentity {
    pub authenticated: bool,
    pub handle: Option<String>,
}

impl IdentityProvider for MockIdentity {
    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn creator_handle(&self) -> Option<String> {
        self.handle.clone()
    }

    fn id_token(&self) -> Option<SecretString> {
        self.authenticated
            .then(|| SecretString::new("id-token-for-tests".into()))
    }
}

pub struct MockCredentials(pub bool);

impl CredentialProvider for MockCredentials {
    fn has_valid_credential(&self) -> bool {
        self.0
    }
}

#[derive(Default)]
pub struct MockBuilder {
    pub fail: Option<String>,
    pub panic: bool,
    /// Build blocks until notified
    pub gate: Option<Arc<Notify>>,
    pub calls: AtomicUsize,
    pub output_paths: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl BuildProvider for MockBuilder {
    async fn build(
        &self,
        output_path: &Path,
        on_progress: &ProgressFn,
    ) -> anyhow::Result<BuildArtifact> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output_paths
            .lock()
            .unwrap()
            .push(output_path.to_path_buf());
        on_progress("Compiling...".to_string());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.panic {
            panic!("build toolchain crashed");
        }
        if let Some(message) = &self.fail {
            anyhow::bail!("{}", message);
        }

        Ok(BuildArtifact {
            artifact_path: output_path.to_path_buf(),
        })
    }
}

#[derive(Default)]
pub struct MockDirectory {
    pub repositories: Vec<String>,
    pub fail: bool,
}

#[async_trait]
impl RepositoryDirectory for MockDirectory {
    async fn list_related(
        &self,
        _base_name: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<RepositoryCandidate>> {
        if self.fail {
            anyhow::bail!("directory unavailable");
        }
        Ok(self
            .repositories
            .iter()
            .take(limit)
            .map(|name| RepositoryCandidate {
                name: name.clone(),
                is_recognized_project_type: true,
                live_url: Some(format!("https://alice.example.com/{}/", name)),
                last_updated: None,
            })
            .collect())
    }

    async fn generate_unique_name(&self, base_name: &str) -> String {
        let base = self.sanitize_name(base_name);
        let mut candidate = base.clone();
        let mut counter = 1;
        while self.repositories.contains(&candidate) {
            candidate = format!("{}-{}", base, counter);
            counter += 1;
        }
        candidate
    }
}

#[derive(Default)]
pub struct MockPublisher {
    pub fail: Option<String>,
    /// Name the host reports back instead of the requested one
    pub rename_to: Option<String>,
    pub requests: Mutex<Vec<(String, DeploymentIntent)>>,
    pub releases: AtomicUsize,
}

impl MockPublisher {
    pub fn upload_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<(String, DeploymentIntent)> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ArtifactPublisher for MockPublisher {
    async fn upload(
        &self,
        request: UploadRequest,
        on_progress: &ProgressFn,
    ) -> anyhow::Result<UploadOutcome> {
        self.requests
            .lock()
            .unwrap()
            .push((request.target_name.clone(), request.intent));
        on_progress(format!("Uploading {}", request.target_name));

        if let Some(message) = &self.fail {
            anyhow::bail!("{}", message);
        }

        let name = self.rename_to.clone().unwrap_or(request.target_name);
        Ok(UploadOutcome {
            live_url: format!("https://{}.example.com/{}/", request.creator_handle, name),
            actual_target_name: name,
        })
    }

    async fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// A full set of mocks; tweak the fields before calling [`MockSetup::orchestrator`]
pub struct MockSetup {
    pub identity: MockIdentity,
    pub credentials: bool,
    pub builder: Arc<MockBuilder>,
    pub directory: MockDirectory,
    pub publisher: Arc<MockPublisher>,
    pub project_name: Option<String>,
}

impl Default for MockSetup {
    fn default() -> Self {
        Self {
            identity: MockIdentity {
                authenticated: true,
                handle: Some("alice".to_string()),
            },
            credentials: true,
            builder: Arc::new(MockBuilder::default()),
            directory: MockDirectory::default(),
            publisher: Arc::new(MockPublisher::default()),
            project_name: Some("MyGame".to_string()),
        }
    }
}

impl MockSetup {
    pub fn orchestrator(self, project_path: &Path) -> PublishOrchestrator {
        let config = PublisherConfig {
            project: Some(ProjectConfig {
                name: self.project_name,
            }),
            identity: Some(IdentityConfig {
                creator_handle: self.identity.handle.clone(),
            }),
            ..Default::default()
        };

        PublishOrchestrator::new(
            project_path,
            config,
            Collaborators {
                identity: Arc::new(self.identity),
                credentials: Arc::new(MockCredentials(self.credentials)),
                builder: self.builder,
                directory: Arc::new(self.directory),
                publisher: self.publisher,
            },
        )
    }
}
