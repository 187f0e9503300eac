//! Orchestration layer for web publishing
//!
//! This module drives the publish pipeline (build → target → deploy →
//! complete), resolves new-vs-update targets and supervises the single
//! in-flight publish.

pub mod publish_orchestrator;
pub mod supervisor;
pub mod target_resolver;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::core::state_machine::PublishStep;

// Re-export main types for convenience
pub use publish_orchestrator::{Collaborators, PublishOrchestrator};
pub use supervisor::PublishSupervisor;
pub use target_resolver::{TargetOption, TargetOptionKind, TargetOptions};

/// What a publish invocation should do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishAction {
    /// Publish to the session's current target
    Publish,
    /// Re-publish the last target, never creating a new one
    Update,
}

/// Progress notification from a running publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishEvent {
    /// The pipeline entered a new step.
    StepChanged { step: PublishStep, status: String },
    /// Free-form progress text from a collaborator.
    Status(String),
    /// The pipeline stopped.
    Finished { success: bool, message: String },
}

/// Sending half for [`PublishEvent`]s. Unbounded so emitters never block.
pub type EventSender = mpsc::UnboundedSender<PublishEvent>;

pub(crate) fn emit(events: &EventSender, event: PublishEvent) {
    // The receiver may be gone when nobody is listening
    let _ = events.send(event);
}
