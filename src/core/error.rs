//! Error handling for web publishing
//!
//! Every collaborator failure is converted into a [`PublishError`] at the
//! orchestrator boundary. Each variant carries recovery guidance for the
//! user-facing failure notice.

use thiserror::Error;

/// One of the startup gates that must hold before a publish can begin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionFailure {
    /// No valid identity session
    NotAuthenticated,
    /// The creator handle has not been reserved
    MissingCreatorHandle,
    /// No valid hosting credential is configured
    MissingHostingCredential,
}

impl std::fmt::Display for PreconditionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NotAuthenticated => "not signed in",
            Self::MissingCreatorHandle => "creator handle has not been reserved",
            Self::MissingHostingCredential => "hosting credential is not configured",
        };
        f.write_str(text)
    }
}

/// Main error type for publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Cannot start publishing: {0}")]
    Precondition(PreconditionFailure),

    #[error("A publish is already in progress")]
    AlreadyRunning,

    #[error("Local build failed: {message}")]
    Build { message: String },

    #[error("Could not list existing projects: {message}")]
    Directory { message: String },

    #[error("Deployment failed: {message}")]
    Publish { message: String },

    #[error("Unexpected error: {message}")]
    Internal { message: String },

    #[error("Invalid target selection {index} (only {len} options available)")]
    InvalidSelection { index: usize, len: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PublishError {
    pub fn build(error: impl std::fmt::Display) -> Self {
        Self::Build {
            message: error.to_string(),
        }
    }

    pub fn directory(error: impl std::fmt::Display) -> Self {
        Self::Directory {
            message: error.to_string(),
        }
    }

    pub fn publish(error: impl std::fmt::Display) -> Self {
        Self::Publish {
            message: error.to_string(),
        }
    }

    pub fn internal(error: impl std::fmt::Display) -> Self {
        Self::Internal {
            message: error.to_string(),
        }
    }

    /// Check if the user can fix this and re-invoke the pipeline
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Internal { .. } | Self::Config(_))
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::Precondition(PreconditionFailure::NotAuthenticated) => vec![
                "Sign in before publishing",
                "Set PUBLISH_ID_TOKEN for the current session",
            ],
            Self::Precondition(PreconditionFailure::MissingCreatorHandle) => vec![
                "Reserve a creator handle first",
                "Set identity.creatorHandle in .web-publisher.yaml or PUBLISH_CREATOR_HANDLE",
            ],
            Self::Precondition(PreconditionFailure::MissingHostingCredential) => vec![
                "Configure a hosting token",
                "Set PUBLISH_HOSTING_TOKEN in the environment",
            ],
            Self::AlreadyRunning => vec!["Wait for the current publish to finish"],
            Self::Build { .. } => vec![
                "Check the build output above",
                "Verify build.command or build.sourceDir in the configuration",
            ],
            Self::Directory { .. } => vec![
                "Check your network connection",
                "A new project will be created instead",
            ],
            Self::Publish { .. } => vec![
                "Check your network connection",
                "Your previously published site has not been changed",
                "Run the publish again",
            ],
            Self::Internal { .. } => vec!["Run again with -v and report the log output"],
            Self::InvalidSelection { .. } => vec!["Run `web-publisher targets` to list options"],
            Self::Config(_) => vec!["Check .web-publisher.yaml for errors"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Precondition(_) => "PRECONDITION_FAILED",
            Self::AlreadyRunning => "ALREADY_RUNNING",
            Self::Build { .. } => "BUILD_FAILED",
            Self::Directory { .. } => "DIRECTORY_FAILED",
            Self::Publish { .. } => "PUBLISH_FAILED",
            Self::Internal { .. } => "INTERNAL_ERROR",
            Self::InvalidSelection { .. } => "INVALID_SELECTION",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}
