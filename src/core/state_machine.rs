//! Publish session state machine
//!
//! A [`PublishSession`] is a plain value: pipeline functions take it, move it
//! through [`PublishStep`]s and hand it back. Every transition is recorded
//! so a finished session can explain how it got there.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::naming;

/// Pipeline step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishStep {
    Ready,
    BuildingLocally,
    CreatingOrUpdatingTarget,
    Deploying,
    Complete,
}

impl PublishStep {
    /// Steps that a failure rolls back from
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::BuildingLocally | Self::CreatingOrUpdatingTarget | Self::Deploying
        )
    }

    /// Check whether `to` is a legal next step
    pub fn can_transition_to(&self, to: PublishStep) -> bool {
        use PublishStep::*;

        match (self, to) {
            (Ready, BuildingLocally) => true,
            (BuildingLocally, CreatingOrUpdatingTarget) => true,
            (CreatingOrUpdatingTarget, Deploying) => true,
            (Deploying, Complete) => true,
            // Update re-enters the pipeline from a finished session
            (Complete, Ready) => true,
            (from, Ready) => from.is_in_flight(),
            _ => false,
        }
    }
}

impl std::fmt::Display for PublishStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Ready => "Ready",
            Self::BuildingLocally => "Building locally",
            Self::CreatingOrUpdatingTarget => "Preparing target",
            Self::Deploying => "Deploying",
            Self::Complete => "Complete",
        };
        f.write_str(text)
    }
}

/// Where the output will be published
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishTarget {
    #[serde(rename = "repositoryName")]
    pub repository_name: String,

    /// Target must be created rather than updated
    #[serde(rename = "isNew")]
    pub is_new: bool,

    #[serde(rename = "displayUrl")]
    pub display_url: String,
}

impl PublishTarget {
    /// Build a target, sanitizing the name first
    pub fn new(creator_handle: &str, domain: &str, raw_name: &str, is_new: bool) -> Self {
        let repository_name = naming::sanitize_name(raw_name);
        let display_url = naming::display_url(creator_handle, domain, &repository_name);

        Self {
            repository_name,
            is_new,
            display_url,
        }
    }
}

/// Completion flags for the in-flight steps
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepProgress {
    pub built: bool,
    #[serde(rename = "targetReady")]
    pub target_ready: bool,
    pub deployed: bool,
}

impl StepProgress {
    pub fn all_done() -> Self {
        Self {
            built: true,
            target_ready: true,
            deployed: true,
        }
    }
}

/// Step transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepTransition {
    pub from: PublishStep,
    pub to: PublishStep,
    pub timestamp: DateTime<Utc>,
}

/// Mutable state of one publish attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishSession {
    pub id: Uuid,

    pub step: PublishStep,

    #[serde(rename = "isRunning")]
    pub is_running: bool,

    /// Last human-readable progress text
    #[serde(rename = "statusMessage")]
    pub status_message: String,

    pub target: PublishTarget,

    /// Set only on success
    #[serde(rename = "resultUrl", skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,

    #[serde(rename = "lastError", skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    pub progress: StepProgress,

    /// Working project name when updating a repository whose name differs
    /// from the local project's
    #[serde(rename = "projectNameOverride", skip_serializing_if = "Option::is_none")]
    pub project_name_override: Option<String>,

    pub transitions: Vec<StepTransition>,
}

impl PublishSession {
    /// Fresh session in `Ready` for the given target
    pub fn new(target: PublishTarget) -> Self {
        Self {
            id: Uuid::new_v4(),
            step: PublishStep::Ready,
            is_running: false,
            status_message: String::new(),
            target,
            result_url: None,
            last_error: None,
            progress: StepProgress::default(),
            project_name_override: None,
            transitions: Vec::new(),
        }
    }

    /// Session restored from a previous successful publish
    pub fn restored(target: PublishTarget, result_url: String) -> Self {
        let mut session = Self::new(target);
        session.step = PublishStep::Complete;
        session.result_url = Some(result_url);
        session.progress = StepProgress::all_done();
        session
    }

    /// Move to `to`, recording the transition
    ///
    /// Illegal transitions are recorded as well but logged, so a bug in the
    /// pipeline shows up in the history instead of silently vanishing.
    pub fn transition(&mut self, to: PublishStep, status: impl Into<String>) {
        if !self.step.can_transition_to(to) {
            tracing::warn!(session = %self.id, from = ?self.step, to = ?to, "unexpected step transition");
        }

        self.transitions.push(StepTransition {
            from: self.step,
            to,
            timestamp: Utc::now(),
        });
        self.step = to;
        self.status_message = status.into();
    }

    /// Record a failure and roll back to `Ready`
    ///
    /// In-flight flags are cleared; `result_url` from an earlier success
    /// is kept because that site is still live.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();

        if self.step != PublishStep::Ready {
            self.transition(PublishStep::Ready, format!("Publishing failed: {}", message));
        } else {
            self.status_message = format!("Publishing failed: {}", message);
        }

        self.progress = StepProgress::default();
        self.is_running = false;
        self.last_error = Some(message);
    }

    pub fn is_complete(&self) -> bool {
        self.step == PublishStep::Complete
    }

    /// Milliseconds between the first and the last transition
    pub fn elapsed_ms(&self) -> i64 {
        match (self.transitions.first(), self.transitions.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_milliseconds(),
            _ => 0,
        }
    }

    /// Transition history as human-readable text
    pub fn history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| format!("{}: {:?} → {:?}", t.timestamp.to_rfc3339(), t.from, t.to))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
