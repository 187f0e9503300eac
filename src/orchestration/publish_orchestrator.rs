//! Publish Orchestrator - drives one publish session through the pipeline
//!
//! Manages the complete publishing workflow:
//! - Startup gates (identity, creator handle, hosting credential)
//! - Local build into a timestamped output directory
//! - Target finalization (new vs. update)
//! - Upload and release of the artifact publisher
//! - Persistence of the last published location
//!
//! Failures never escape [`PublishOrchestrator::run`]: they are converted
//! into a [`PublishError`], recorded on the session and the session is
//! rolled back to `Ready`.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::target_resolver::{self, TargetOptions};
use super::{EventSender, PublishAction, PublishEvent, emit};
use crate::core::config::PublisherConfig;
use crate::core::error::{PreconditionFailure, PublishError};
use crate::core::preferences::{PreferenceStore, PublishedRecord};
use crate::core::state_machine::{PublishSession, PublishStep, PublishTarget};
use crate::core::traits::{
    ArtifactPublisher, BuildProvider, CredentialProvider, DeploymentIntent, IdentityProvider,
    RepositoryDirectory, UploadRequest,
};

/// External collaborators the pipeline calls out to
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub builder: Arc<dyn BuildProvider>,
    pub directory: Arc<dyn RepositoryDirectory>,
    pub publisher: Arc<dyn ArtifactPublisher>,
}

/// Main publish orchestrator
pub struct PublishOrchestrator {
    project_path: PathBuf,
    config: PublisherConfig,
    collaborators: Collaborators,
    preferences: PreferenceStore,
}

impl PublishOrchestrator {
    /// Create a new PublishOrchestrator
    ///
    /// # Arguments
    ///
    /// * `project_path` - Path to the project directory
    /// * `config` - Loaded configuration
    /// * `collaborators` - Identity, build, directory and hosting providers
    pub fn new<P: AsRef<Path>>(
        project_path: P,
        config: PublisherConfig,
        collaborators: Collaborators,
    ) -> Self {
        let project_path = project_path.as_ref().to_path_buf();

        Self {
            preferences: PreferenceStore::new(&project_path),
            project_path,
            config,
            collaborators,
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    pub fn domain(&self) -> &str {
        self.config.domain()
    }

    pub fn creator_handle(&self) -> String {
        self.collaborators
            .identity
            .creator_handle()
            .unwrap_or_default()
    }

    /// Base name of the project: the configured name, else the directory name
    pub fn base_name(&self) -> String {
        if let Some(name) = self.config.project_name()
            && !name.trim().is_empty()
        {
            return name.to_string();
        }

        let path = self
            .project_path
            .canonicalize()
            .unwrap_or_else(|_| self.project_path.clone());
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Check the startup gates in order, returning the creator handle
    pub fn check_preconditions(&self) -> Result<String, PublishError> {
        if !self.collaborators.identity.is_authenticated() {
            return Err(PublishError::Precondition(
                PreconditionFailure::NotAuthenticated,
            ));
        }

        let handle = self
            .collaborators
            .identity
            .creator_handle()
            .filter(|h| !h.trim().is_empty())
            .ok_or(PublishError::Precondition(
                PreconditionFailure::MissingCreatorHandle,
            ))?;

        if !self.collaborators.credentials.has_valid_credential() {
            return Err(PublishError::Precondition(
                PreconditionFailure::MissingHostingCredential,
            ));
        }

        Ok(handle)
    }

    /// Target for a project that has never been published
    pub fn fresh_target(&self) -> PublishTarget {
        PublishTarget::new(
            &self.creator_handle(),
            self.domain(),
            &self.base_name(),
            true,
        )
    }

    /// Create the session for this project
    ///
    /// A previously persisted publish restores a `Complete` session pointing
    /// at the last target. Unreadable preferences are logged and ignored.
    pub async fn initialize(&self) -> PublishSession {
        match self.preferences.load_published().await {
            Ok(Some(record)) => {
                let target = PublishTarget::new(
                    &self.creator_handle(),
                    self.domain(),
                    &record.last_project_name,
                    false,
                );
                debug!(target = %target.repository_name, url = %record.published_url, "restored last publish");
                PublishSession::restored(target, record.published_url)
            }
            Ok(None) => PublishSession::new(self.fresh_target()),
            Err(e) => {
                warn!(
                    path = %self.preferences.file_path().display(),
                    error = %e,
                    "ignoring unreadable preferences"
                );
                PublishSession::new(self.fresh_target())
            }
        }
    }

    /// Resolve new-vs-update options for the project
    pub async fn resolve_targets(&self) -> TargetOptions {
        target_resolver::resolve_options(
            self.collaborators.directory.as_ref(),
            &self.base_name(),
            &self.creator_handle(),
            self.domain(),
            self.config.directory_limit(),
        )
        .await
    }

    /// Apply a resolved option to the session
    pub fn select_target(
        &self,
        session: &mut PublishSession,
        options: &mut TargetOptions,
        index: usize,
    ) -> Result<(), PublishError> {
        target_resolver::apply_selection(
            session,
            options,
            index,
            &self.creator_handle(),
            self.domain(),
        )
    }

    /// Forget the last published target and start over with a new one
    pub async fn reset(&self) -> Result<PublishSession, PublishError> {
        self.preferences
            .clear_published()
            .await
            .map_err(|e| PublishError::internal(format!("could not clear preferences: {}", e)))?;

        info!("publish state reset");
        Ok(PublishSession::new(self.fresh_target()))
    }

    /// Timestamped build directory, e.g. `builds/WebBuild_20240131_235959`
    pub fn build_output_path(&self) -> PathBuf {
        self.project_path
            .join(self.config.output_dir())
            .join(format!("WebBuild_{}", Local::now().format("%Y%m%d_%H%M%S")))
    }

    /// Run the pipeline for `session` and hand it back
    ///
    /// When a startup gate fails the session is returned untouched and a
    /// failed [`PublishEvent::Finished`] names the gate.
    pub async fn run(
        &self,
        mut session: PublishSession,
        action: PublishAction,
        events: &EventSender,
    ) -> PublishSession {
        let creator_handle = match self.check_preconditions() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(session = %session.id, error = %e, "publish not started");
                emit(
                    events,
                    PublishEvent::Finished {
                        success: false,
                        message: e.to_string(),
                    },
                );
                return session;
            }
        };

        if session.is_complete() {
            session.transition(PublishStep::Ready, "Preparing update...");
        }
        if action == PublishAction::Update {
            session.target.is_new = false;
        }
        session.last_error = None;
        session.is_running = true;

        match self.execute(&mut session, &creator_handle, events).await {
            Ok(live_url) => {
                info!(
                    session = %session.id,
                    target = %session.target.repository_name,
                    url = %live_url,
                    elapsed_ms = session.elapsed_ms(),
                    "publish complete"
                );
                emit(
                    events,
                    PublishEvent::Finished {
                        success: true,
                        message: format!("Published to {}", live_url),
                    },
                );
            }
            Err(e) => {
                if e.is_recoverable() {
                    warn!(session = %session.id, step = ?session.step, code = e.code(), error = %e, "publish failed");
                } else {
                    error!(session = %session.id, step = ?session.step, code = e.code(), error = %e, "publish failed");
                }
                session.fail(e.to_string());
                emit(
                    events,
                    PublishEvent::Finished {
                        success: false,
                        message: session.status_message.clone(),
                    },
                );
            }
        }

        session
    }

    async fn execute(
        &self,
        session: &mut PublishSession,
        creator_handle: &str,
        events: &EventSender,
    ) -> Result<String, PublishError> {
        let progress_tx = events.clone();
        let on_progress = move |message: String| emit(&progress_tx, PublishEvent::Status(message));

        // Build
        enter(session, events, PublishStep::BuildingLocally, "Building web version...");
        let output_path = self.build_output_path();
        let artifact = self
            .collaborators
            .builder
            .build(&output_path, &on_progress)
            .await
            .map_err(|e| PublishError::build(format!("{:#}", e)))?;
        session.progress.built = true;
        debug!(session = %session.id, artifact = %artifact.artifact_path.display(), "build finished");

        // Target
        enter(
            session,
            events,
            PublishStep::CreatingOrUpdatingTarget,
            "Preparing target...",
        );
        let target_name = session
            .project_name_override
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| Some(session.target.repository_name.clone()).filter(|n| !n.is_empty()))
            .unwrap_or_else(|| self.base_name());
        session.target = PublishTarget::new(
            creator_handle,
            self.domain(),
            &target_name,
            session.target.is_new,
        );
        session.progress.target_ready = true;

        // Deploy
        let intent = DeploymentIntent::from_is_new(session.target.is_new);
        enter(
            session,
            events,
            PublishStep::Deploying,
            format!("Deploying to {}...", session.target.display_url),
        );
        let request = UploadRequest {
            artifact_path: artifact.artifact_path,
            creator_handle: creator_handle.to_string(),
            target_name: session.target.repository_name.clone(),
            intent,
            id_token: self.collaborators.identity.id_token(),
        };
        debug!(session = %session.id, target = %request.target_name, intent = %intent, "uploading");

        let publisher = &self.collaborators.publisher;
        let uploaded = publisher.upload(request, &on_progress).await;
        publisher.release().await;
        let outcome = uploaded.map_err(|e| PublishError::publish(format!("{:#}", e)))?;

        // Persist
        let record = PublishedRecord {
            published_url: outcome.live_url.clone(),
            last_project_name: outcome.actual_target_name.clone(),
        };
        self.preferences
            .save_published(&record)
            .await
            .map_err(|e| PublishError::internal(format!("could not save publish record: {}", e)))?;

        session.progress.deployed = true;
        session.target = PublishTarget::new(
            creator_handle,
            self.domain(),
            &outcome.actual_target_name,
            false,
        );
        session.result_url = Some(outcome.live_url.clone());
        session.is_running = false;
        enter(session, events, PublishStep::Complete, "Published successfully");

        Ok(outcome.live_url)
    }
}

fn enter(
    session: &mut PublishSession,
    events: &EventSender,
    step: PublishStep,
    status: impl Into<String>,
) {
    let status = status.into();
    info!(session = %session.id, step = ?step, "{}", status);
    session.transition(step, status.clone());
    emit(events, PublishEvent::StepChanged { step, status });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state_machine::StepProgress;
    use crate::orchestration::testing::*;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn channel() -> (EventSender, mpsc::UnboundedReceiver<PublishEvent>) {
        mpsc::unbounded_channel()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PublishEvent>) -> Vec<PublishEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn previous_record() -> PublishedRecord {
        PublishedRecord {
            published_url: "https://alice.example.com/mygame/".to_string(),
            last_project_name: "mygame".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_publish_creates_new_target() {
        let temp = TempDir::new().unwrap();
        let setup = MockSetup::default();
        let publisher = Arc::clone(&setup.publisher);
        let orchestrator = setup.orchestrator(temp.path());

        let mut session = orchestrator.initialize().await;
        let mut options = orchestrator.resolve_targets().await;
        assert_eq!(options.len(), 1);
        assert_eq!(options.selected, 0);
        assert_eq!(options.options[0].repository_name, "mygame");

        orchestrator
            .select_target(&mut session, &mut options, 0)
            .unwrap();
        let (tx, _rx) = channel();
        let session = orchestrator.run(session, PublishAction::Publish, &tx).await;

        assert_eq!(session.step, PublishStep::Complete);
        assert!(!session.is_running);
        assert_eq!(
            session.result_url.as_deref(),
            Some("https://alice.example.com/mygame/")
        );
        assert!(!session.target.is_new);
        assert_eq!(session.progress, StepProgress::all_done());
        assert_eq!(
            publisher.last_request(),
            Some(("mygame".to_string(), DeploymentIntent::CreateNew))
        );

        let record = orchestrator.preferences().load_published().await.unwrap();
        assert_eq!(record, Some(previous_record()));
    }

    #[tokio::test]
    async fn test_update_related_repository() {
        let temp = TempDir::new().unwrap();
        let mut setup = MockSetup::default();
        setup.directory.repositories = vec!["mygame-1".to_string()];
        let publisher = Arc::clone(&setup.publisher);
        let orchestrator = setup.orchestrator(temp.path());

        let mut session = orchestrator.initialize().await;
        let mut options = orchestrator.resolve_targets().await;
        assert_eq!(options.len(), 2);
        assert_eq!(options.options[0].display_name, "Update \"mygame-1\"");

        orchestrator
            .select_target(&mut session, &mut options, 0)
            .unwrap();
        assert_eq!(session.target.repository_name, "mygame-1");
        assert!(!session.target.is_new);

        let (tx, _rx) = channel();
        let session = orchestrator.run(session, PublishAction::Publish, &tx).await;

        assert!(session.is_complete());
        assert_eq!(
            publisher.last_request(),
            Some(("mygame-1".to_string(), DeploymentIntent::UpdateExisting))
        );
        assert_eq!(
            session.result_url.as_deref(),
            Some("https://alice.example.com/mygame-1/")
        );
    }

    #[tokio::test]
    async fn test_create_new_keeps_generated_unique_name() {
        let temp = TempDir::new().unwrap();
        let mut setup = MockSetup::default();
        setup.directory.repositories = vec!["mygame".to_string()];
        let publisher = Arc::clone(&setup.publisher);
        let orchestrator = setup.orchestrator(temp.path());

        let mut session = orchestrator.initialize().await;
        let mut options = orchestrator.resolve_targets().await;
        orchestrator
            .select_target(&mut session, &mut options, 1)
            .unwrap();

        let (tx, _rx) = channel();
        orchestrator.run(session, PublishAction::Publish, &tx).await;

        assert_eq!(
            publisher.last_request(),
            Some(("mygame-1".to_string(), DeploymentIntent::CreateNew))
        );
    }

    #[tokio::test]
    async fn test_build_failure_rolls_back() {
        let temp = TempDir::new().unwrap();
        let setup = MockSetup {
            builder: Arc::new(MockBuilder {
                fail: Some("missing index.html".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let publisher = Arc::clone(&setup.publisher);
        let orchestrator = setup.orchestrator(temp.path());
        orchestrator
            .preferences()
            .save_published(&previous_record())
            .await
            .unwrap();

        let session = orchestrator.initialize().await;
        let (tx, mut rx) = channel();
        let session = orchestrator.run(session, PublishAction::Update, &tx).await;

        assert_eq!(session.step, PublishStep::Ready);
        assert!(!session.is_running);
        assert_eq!(session.progress, StepProgress::default());
        assert!(
            session
                .last_error
                .as_deref()
                .unwrap()
                .contains("missing index.html")
        );
        assert!(session.status_message.starts_with("Publishing failed: "));
        assert_eq!(publisher.upload_count(), 0);
        assert_eq!(
            orchestrator.preferences().load_published().await.unwrap(),
            Some(previous_record())
        );

        let events = drain(&mut rx);
        assert!(matches!(
            events.last(),
            Some(PublishEvent::Finished { success: false, .. })
        ));
    }

    #[tokio::test]
    async fn test_upload_failure_releases_and_preserves_state() {
        let temp = TempDir::new().unwrap();
        let setup = MockSetup {
            publisher: Arc::new(MockPublisher {
                fail: Some("connection reset".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let publisher = Arc::clone(&setup.publisher);
        let orchestrator = setup.orchestrator(temp.path());
        orchestrator
            .preferences()
            .save_published(&previous_record())
            .await
            .unwrap();

        let session = orchestrator.initialize().await;
        let (tx, _rx) = channel();
        let session = orchestrator.run(session, PublishAction::Update, &tx).await;

        assert_eq!(session.step, PublishStep::Ready);
        assert!(
            session
                .last_error
                .as_deref()
                .unwrap()
                .contains("connection reset")
        );
        assert_eq!(publisher.releases.load(Ordering::SeqCst), 1);
        // The earlier site is still live
        assert_eq!(
            session.result_url.as_deref(),
            Some("https://alice.example.com/mygame/")
        );
        assert_eq!(
            orchestrator.preferences().load_published().await.unwrap(),
            Some(previous_record())
        );
    }

    #[tokio::test]
    async fn test_release_after_successful_upload() {
        let temp = TempDir::new().unwrap();
        let setup = MockSetup::default();
        let publisher = Arc::clone(&setup.publisher);
        let orchestrator = setup.orchestrator(temp.path());

        let session = orchestrator.initialize().await;
        let (tx, _rx) = channel();
        orchestrator.run(session, PublishAction::Publish, &tx).await;

        assert_eq!(publisher.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_precondition_order() {
        let temp = TempDir::new().unwrap();

        let mut setup = MockSetup::default();
        setup.identity = MockIdentity {
            authenticated: false,
            handle: None,
        };
        setup.credentials = false;
        let error = setup
            .orchestrator(temp.path())
            .check_preconditions()
            .unwrap_err();
        assert!(matches!(
            error,
            PublishError::Precondition(PreconditionFailure::NotAuthenticated)
        ));

        let mut setup = MockSetup::default();
        setup.identity.handle = Some("  ".to_string());
        setup.credentials = false;
        let error = setup
            .orchestrator(temp.path())
            .check_preconditions()
            .unwrap_err();
        assert!(matches!(
            error,
            PublishError::Precondition(PreconditionFailure::MissingCreatorHandle)
        ));

        let mut setup = MockSetup::default();
        setup.credentials = false;
        let error = setup
            .orchestrator(temp.path())
            .check_preconditions()
            .unwrap_err();
        assert!(matches!(
            error,
            PublishError::Precondition(PreconditionFailure::MissingHostingCredential)
        ));

        let handle = MockSetup::default()
            .orchestrator(temp.path())
            .check_preconditions()
            .unwrap();
        assert_eq!(handle, "alice");
    }

    #[tokio::test]
    async fn test_failed_precondition_does_not_start() {
        let temp = TempDir::new().unwrap();
        let mut setup = MockSetup::default();
        setup.credentials = false;
        let builder = Arc::clone(&setup.builder);
        let orchestrator = setup.orchestrator(temp.path());

        let session = orchestrator.initialize().await;
        let before = session.clone();
        let (tx, mut rx) = channel();
        let after = orchestrator.run(session, PublishAction::Publish, &tx).await;

        assert_eq!(after, before);
        assert_eq!(builder.calls.load(Ordering::SeqCst), 0);
        match drain(&mut rx).as_slice() {
            [PublishEvent::Finished { success, message }] => {
                assert!(!success);
                assert!(message.contains("hosting credential"));
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_initialize_restores_last_publish() {
        let temp = TempDir::new().unwrap();
        let orchestrator = MockSetup::default().orchestrator(temp.path());
        orchestrator
            .preferences()
            .save_published(&PublishedRecord {
                published_url: "https://alice.example.com/mygame-2/".to_string(),
                last_project_name: "mygame-2".to_string(),
            })
            .await
            .unwrap();

        let session = orchestrator.initialize().await;

        assert!(session.is_complete());
        assert!(!session.target.is_new);
        assert_eq!(session.target.repository_name, "mygame-2");
        assert_eq!(
            session.result_url.as_deref(),
            Some("https://alice.example.com/mygame-2/")
        );
    }

    #[tokio::test]
    async fn test_initialize_ignores_corrupted_preferences() {
        let temp = TempDir::new().unwrap();
        let orchestrator = MockSetup::default().orchestrator(temp.path());
        let path = orchestrator.preferences().file_path().to_path_buf();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let session = orchestrator.initialize().await;

        assert_eq!(session.step, PublishStep::Ready);
        assert!(session.target.is_new);
    }

    #[tokio::test]
    async fn test_publish_and_reset_recover_from_corrupted_preferences() {
        let temp = TempDir::new().unwrap();
        let setup = MockSetup::default();
        let publisher = Arc::clone(&setup.publisher);
        let orchestrator = setup.orchestrator(temp.path());
        let path = orchestrator.preferences().file_path().to_path_buf();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let session = orchestrator.initialize().await;
        let (tx, _rx) = channel();
        let session = orchestrator.run(session, PublishAction::Publish, &tx).await;

        assert!(session.is_complete());
        assert!(session.last_error.is_none());
        assert_eq!(publisher.upload_count(), 1);
        let record = orchestrator
            .preferences()
            .load_published()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Some(record.published_url), session.result_url);

        std::fs::write(&path, "{ not json").unwrap();
        let session = orchestrator.reset().await.unwrap();

        assert!(session.target.is_new);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_update_from_restored_session() {
        let temp = TempDir::new().unwrap();
        let setup = MockSetup::default();
        let publisher = Arc::clone(&setup.publisher);
        let orchestrator = setup.orchestrator(temp.path());
        orchestrator
            .preferences()
            .save_published(&previous_record())
            .await
            .unwrap();

        let session = orchestrator.initialize().await;
        let (tx, _rx) = channel();
        let session = orchestrator.run(session, PublishAction::Update, &tx).await;

        assert!(session.is_complete());
        assert_eq!(
            publisher.last_request(),
            Some(("mygame".to_string(), DeploymentIntent::UpdateExisting))
        );
        assert_eq!(session.transitions[0].from, PublishStep::Complete);
        assert_eq!(session.transitions[0].to, PublishStep::Ready);
    }

    #[tokio::test]
    async fn test_host_assigned_name_is_persisted() {
        let temp = TempDir::new().unwrap();
        let setup = MockSetup {
            publisher: Arc::new(MockPublisher {
                rename_to: Some("mygame-7".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let orchestrator = setup.orchestrator(temp.path());

        let session = orchestrator.initialize().await;
        let (tx, _rx) = channel();
        let session = orchestrator.run(session, PublishAction::Publish, &tx).await;

        assert_eq!(session.target.repository_name, "mygame-7");
        assert_eq!(
            session.target.display_url,
            "https://alice.example.com/mygame-7/"
        );
        let record = orchestrator
            .preferences()
            .load_published()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.last_project_name, "mygame-7");
    }

    #[tokio::test]
    async fn test_reset_clears_persisted_target() {
        let temp = TempDir::new().unwrap();
        let orchestrator = MockSetup::default().orchestrator(temp.path());
        orchestrator
            .preferences()
            .save_published(&previous_record())
            .await
            .unwrap();

        let session = orchestrator.reset().await.unwrap();

        assert_eq!(session.step, PublishStep::Ready);
        assert!(session.target.is_new);
        assert!(session.result_url.is_none());
        assert_eq!(
            orchestrator.preferences().load_published().await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_events_follow_the_pipeline() {
        let temp = TempDir::new().unwrap();
        let orchestrator = MockSetup::default().orchestrator(temp.path());

        let session = orchestrator.initialize().await;
        let (tx, mut rx) = channel();
        orchestrator.run(session, PublishAction::Publish, &tx).await;

        let events = drain(&mut rx);
        let steps: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                PublishEvent::StepChanged { step, .. } => Some(*step),
                _ => None,
            })
            .collect();
        assert_eq!(
            steps,
            vec![
                PublishStep::BuildingLocally,
                PublishStep::CreatingOrUpdatingTarget,
                PublishStep::Deploying,
                PublishStep::Complete,
            ]
        );
        assert!(events.contains(&PublishEvent::Status("Compiling...".to_string())));
        assert!(matches!(
            events.last(),
            Some(PublishEvent::Finished { success: true, .. })
        ));
    }

    #[tokio::test]
    async fn test_build_output_is_timestamped() {
        let temp = TempDir::new().unwrap();
        let setup = MockSetup::default();
        let builder = Arc::clone(&setup.builder);
        let orchestrator = setup.orchestrator(temp.path());

        let session = orchestrator.initialize().await;
        let (tx, _rx) = channel();
        orchestrator.run(session, PublishAction::Publish, &tx).await;

        let paths = builder.output_paths.lock().unwrap();
        let path = &paths[0];
        assert!(path.starts_with(temp.path().join("builds")));
        let dir_name = path.file_name().unwrap().to_string_lossy();
        assert!(dir_name.starts_with("WebBuild_"));
        assert_eq!(dir_name.len(), "WebBuild_20240101_120000".len());
    }

    #[tokio::test]
    async fn test_base_name_falls_back_to_directory() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("Space Shooter");
        std::fs::create_dir(&project).unwrap();

        let setup = MockSetup {
            project_name: None,
            ..Default::default()
        };
        let orchestrator = setup.orchestrator(&project);

        assert_eq!(orchestrator.base_name(), "Space Shooter");
        assert_eq!(orchestrator.fresh_target().repository_name, "space-shooter");
    }

    #[tokio::test]
    async fn test_empty_name_becomes_default() {
        let temp = TempDir::new().unwrap();
        let setup = MockSetup {
            project_name: Some("???".to_string()),
            ..Default::default()
        };
        let orchestrator = setup.orchestrator(temp.path());

        assert_eq!(orchestrator.fresh_target().repository_name, "web-project");
    }
}
