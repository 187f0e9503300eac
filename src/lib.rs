pub mod core;
pub mod orchestration;
pub mod providers;
pub mod security;

pub use crate::core::*;
pub use orchestration::{
    Collaborators, PublishAction, PublishEvent, PublishOrchestrator, PublishSupervisor,
    TargetOption, TargetOptionKind, TargetOptions,
};
pub use providers::{
    CommandBuildProvider, DirectoryPublisher, EnvCredentialProvider, LocalRepositoryDirectory,
    PrebuiltBuildProvider, StaticIdentity,
};
pub use security::{CommandError, SafeCommandExecutor, SecureTokenManager};
