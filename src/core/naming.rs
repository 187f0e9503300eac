//! Target naming rules
//!
//! Every repository name that reaches a URL or a remote call goes through
//! [`sanitize_name`] first.

use lazy_static::lazy_static;
use regex::Regex;

/// Name used when the project base name sanitizes to nothing
pub const DEFAULT_PROJECT_NAME: &str = "web-project";

/// Longest repository name accepted by hosting providers
pub const MAX_NAME_LENGTH: usize = 100;

lazy_static! {
    static ref ILLEGAL_CHARS: Regex = Regex::new(r"[^a-z0-9._-]").unwrap();
    static ref DASH_RUNS: Regex = Regex::new(r"-{2,}").unwrap();
}

/// Sanitize a raw project name into a lowercase, URL-safe identifier
///
/// # Examples
///
/// ```
/// use web_publisher::core::naming::sanitize_name;
///
/// assert_eq!(sanitize_name("My Game!"), "my-game");
/// assert_eq!(sanitize_name(sanitize_name("My Game!").as_str()), "my-game");
/// assert_eq!(sanitize_name("   "), "web-project");
/// ```
pub fn sanitize_name(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let replaced = ILLEGAL_CHARS.replace_all(&lower, "-");
    let collapsed = DASH_RUNS.replace_all(&replaced, "-");

    let mut name = trim_separators(&collapsed).to_string();

    if name.chars().count() > MAX_NAME_LENGTH {
        name = name.chars().take(MAX_NAME_LENGTH).collect();
        name = trim_separators(&name).to_string();
    }

    if name.is_empty() {
        DEFAULT_PROJECT_NAME.to_string()
    } else {
        name
    }
}

fn trim_separators(name: &str) -> &str {
    name.trim_matches(|c| c == '-' || c == '.')
}

/// Check whether a hosted repository belongs to the given project
///
/// A repository is related when, ignoring case, its name equals the
/// sanitized base name, starts with `{base}-` (auto-incremented names),
/// or contains the base name anywhere.
pub fn is_related(base_name: &str, repository_name: &str) -> bool {
    let base = sanitize_name(base_name).to_lowercase();
    let repo = repository_name.to_lowercase();

    if repo == base {
        return true;
    }

    if repo.starts_with(&format!("{}-", base)) {
        return true;
    }

    repo.contains(&base)
}

/// Professional URL for a published target
pub fn display_url(creator_handle: &str, domain: &str, repository_name: &str) -> String {
    format!("https://{}.{}/{}/", creator_handle, domain, repository_name)
}
