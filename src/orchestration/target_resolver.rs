//! Target resolution - decide between updating an existing site and creating a new one
//!
//! Builds the list of selectable publish targets for a project: one
//! "update" option per related hosted repository plus exactly one
//! "create new" option with a name the directory guarantees is free.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::PublishError;
use crate::core::naming;
use crate::core::state_machine::{PublishSession, PublishTarget};
use crate::core::traits::{RepositoryCandidate, RepositoryDirectory};

/// Kind of publish option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetOptionKind {
    UpdateExisting,
    CreateNew,
}

/// One selectable publish target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOption {
    pub kind: TargetOptionKind,
    pub repository_name: String,
    pub display_name: String,
    pub description: String,
    pub display_url: String,
    /// Where the repository is currently live, if published
    pub live_url: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub is_recognized_project_type: bool,
}

impl TargetOption {
    fn update(candidate: RepositoryCandidate, creator_handle: &str, domain: &str) -> Self {
        let name = naming::sanitize_name(&candidate.name);
        Self {
            kind: TargetOptionKind::UpdateExisting,
            display_name: format!("Update \"{}\"", name),
            description: if candidate.is_recognized_project_type {
                "Published web project".to_string()
            } else {
                "Repository".to_string()
            },
            display_url: naming::display_url(creator_handle, domain, &name),
            live_url: candidate.live_url,
            last_updated: candidate.last_updated,
            is_recognized_project_type: candidate.is_recognized_project_type,
            repository_name: name,
        }
    }

    fn create(name: String, creator_handle: &str, domain: &str) -> Self {
        Self {
            kind: TargetOptionKind::CreateNew,
            display_name: format!("Create New \"{}\"", name),
            description: "New web project".to_string(),
            display_url: naming::display_url(creator_handle, domain, &name),
            live_url: None,
            last_updated: None,
            is_recognized_project_type: false,
            repository_name: name,
        }
    }

    pub fn is_new(&self) -> bool {
        self.kind == TargetOptionKind::CreateNew
    }
}

/// Resolved option list with its default selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOptions {
    pub options: Vec<TargetOption>,
    pub selected: usize,
    /// Set when the directory could not be listed and only "create new" is offered
    pub directory_error: Option<String>,
}

impl TargetOptions {
    pub fn selected_option(&self) -> Option<&TargetOption> {
        self.options.get(self.selected)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// Resolve publish options for `base_name`
///
/// A failing directory does not fail resolution: the list falls back to
/// the single "create new" option and the error is kept for display.
pub async fn resolve_options(
    directory: &dyn RepositoryDirectory,
    base_name: &str,
    creator_handle: &str,
    domain: &str,
    limit: usize,
) -> TargetOptions {
    let mut options = Vec::new();
    let mut directory_error = None;

    match directory.list_related(base_name, limit).await {
        Ok(candidates) => {
            debug!(base = %base_name, found = candidates.len(), "listed repositories");
            options.extend(
                candidates
                    .into_iter()
                    .filter(|c| naming::is_related(base_name, &c.name))
                    .map(|c| TargetOption::update(c, creator_handle, domain)),
            );
        }
        Err(e) => {
            let error = PublishError::directory(&e);
            warn!(base = %base_name, error = %e, "falling back to create-new only");
            directory_error = Some(error.to_string());
        }
    }

    let new_name = directory.generate_unique_name(base_name).await;
    options.push(TargetOption::create(
        naming::sanitize_name(&new_name),
        creator_handle,
        domain,
    ));

    TargetOptions {
        options,
        selected: 0,
        directory_error,
    }
}

/// Apply the option at `index` to a session's target
///
/// Choosing an existing repository also sets the session's working project
/// name so later steps address that repository rather than the local
/// project name.
pub fn apply_selection(
    session: &mut PublishSession,
    options: &mut TargetOptions,
    index: usize,
    creator_handle: &str,
    domain: &str,
) -> Result<(), PublishError> {
    let option = options
        .options
        .get(index)
        .ok_or(PublishError::InvalidSelection {
            index,
            len: options.options.len(),
        })?;

    session.target = PublishTarget::new(
        creator_handle,
        domain,
        &option.repository_name,
        option.is_new(),
    );
    session.project_name_override = match option.kind {
        TargetOptionKind::UpdateExisting => Some(option.repository_name.clone()),
        TargetOptionKind::CreateNew => None,
    };
    options.selected = index;

    debug!(
        session = %session.id,
        target = %session.target.repository_name,
        is_new = session.target.is_new,
        "target selected"
    );

    Ok(())
}
