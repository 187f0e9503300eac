//! Single-flight supervision of publish runs
//!
//! The supervisor owns the live session snapshot. Each run is spawned on
//! its own task; a second task forwards pipeline events to the caller,
//! folds them into the snapshot and stores the final session when the run
//! ends, including when it panicked.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::publish_orchestrator::PublishOrchestrator;
use super::target_resolver::TargetOptions;
use super::{PublishAction, PublishEvent, emit};
use crate::core::error::PublishError;
use crate::core::state_machine::PublishSession;

/// Runs at most one publish at a time
pub struct PublishSupervisor {
    orchestrator: Arc<PublishOrchestrator>,
    session: Arc<Mutex<PublishSession>>,
    task: Mutex<Option<JoinHandle<PublishSession>>>,
}

impl PublishSupervisor {
    pub fn new(orchestrator: PublishOrchestrator, session: PublishSession) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            session: Arc::new(Mutex::new(session)),
            task: Mutex::new(None),
        }
    }

    /// Supervisor with the session restored from preferences
    pub async fn initialize(orchestrator: PublishOrchestrator) -> Self {
        let session = orchestrator.initialize().await;
        Self::new(orchestrator, session)
    }

    pub fn orchestrator(&self) -> &PublishOrchestrator {
        &self.orchestrator
    }

    /// Clone of the current session
    pub fn snapshot(&self) -> PublishSession {
        lock(&self.session).clone()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.session).is_running
    }

    /// Start a publish run
    ///
    /// # Errors
    ///
    /// - `PublishError::AlreadyRunning` - Another run is in flight
    /// - `PublishError::Precondition` - A startup gate failed; the session is untouched
    pub fn start(
        &self,
        action: PublishAction,
    ) -> Result<mpsc::UnboundedReceiver<PublishEvent>, PublishError> {
        let session = {
            let mut current = lock(&self.session);
            if current.is_running {
                return Err(PublishError::AlreadyRunning);
            }
            self.orchestrator.check_preconditions()?;

            current.is_running = true;
            current.clone()
        };

        let (pipeline_tx, mut pipeline_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let orchestrator = Arc::clone(&self.orchestrator);
        let pipeline = tokio::spawn(async move {
            orchestrator.run(session, action, &pipeline_tx).await
        });

        let shared = Arc::clone(&self.session);
        let supervisor = tokio::spawn(async move {
            // Ends once the pipeline drops its sender, on return or unwind
            while let Some(event) = pipeline_rx.recv().await {
                apply(&mut lock(&shared), &event);
                emit(&events_tx, event);
            }

            let mut finished = match pipeline.await {
                Ok(session) => session,
                Err(join_error) => {
                    let error = PublishError::internal(if join_error.is_panic() {
                        "publish task panicked"
                    } else {
                        "publish task was cancelled"
                    });
                    error!(code = error.code(), error = %error, "publish task aborted");

                    let mut session = lock(&shared).clone();
                    session.fail(error.to_string());
                    emit(
                        &events_tx,
                        PublishEvent::Finished {
                            success: false,
                            message: session.status_message.clone(),
                        },
                    );
                    session
                }
            };

            finished.is_running = false;
            *lock(&shared) = finished.clone();
            debug!(session = %finished.id, step = ?finished.step, "publish run settled");
            finished
        });

        *lock(&self.task) = Some(supervisor);
        Ok(events_rx)
    }

    /// Wait for the in-flight run and return the final session
    pub async fn wait(&self) -> Result<PublishSession, PublishError> {
        let handle = lock(&self.task).take();

        match handle {
            Some(handle) => handle.await.map_err(PublishError::internal),
            None => Ok(self.snapshot()),
        }
    }

    /// Select a resolved target for the next run
    pub fn select_target(
        &self,
        options: &mut TargetOptions,
        index: usize,
    ) -> Result<PublishSession, PublishError> {
        let mut session = lock(&self.session);
        if session.is_running {
            return Err(PublishError::AlreadyRunning);
        }

        self.orchestrator
            .select_target(&mut session, options, index)?;
        Ok(session.clone())
    }

    /// Clear the persisted target and start over
    ///
    /// The session counts as running until the reset settles, so no run
    /// can start against preferences that are being cleared.
    pub async fn reset(&self) -> Result<PublishSession, PublishError> {
        {
            let mut session = lock(&self.session);
            if session.is_running {
                return Err(PublishError::AlreadyRunning);
            }
            session.is_running = true;
        }

        let result = self.orchestrator.reset().await;

        let mut session = lock(&self.session);
        match result {
            Ok(fresh) => {
                *session = fresh.clone();
                Ok(fresh)
            }
            Err(e) => {
                session.is_running = false;
                Err(e)
            }
        }
    }
}

fn apply(session: &mut PublishSession, event: &PublishEvent) {
    match event {
        PublishEvent::StepChanged { step, status } => {
            session.step = *step;
            session.status_message = status.clone();
        }
        PublishEvent::Status(message) => session.status_message = message.clone(),
        PublishEvent::Finished { .. } => {}
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Poisoning is ignored; every write under the lock replaces whole fields
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
