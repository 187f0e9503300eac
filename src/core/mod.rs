pub mod config;
pub mod config_loader;
pub mod error;
pub mod naming;
pub mod preferences;
pub mod state_machine;
pub mod traits;

pub use config::PublisherConfig;
pub use config_loader::{ConfigLoadOptions, ConfigLoader};
pub use error::*;
pub use preferences::{PreferenceStore, PublishedRecord};
pub use state_machine::{PublishSession, PublishStep, PublishTarget, StepProgress};
pub use traits::*;
