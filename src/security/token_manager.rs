//! Secure token manager with memory-safe handling and masking capabilities
//!
//! Identity and hosting tokens are read from the environment and held as
//! `secrecy` secrets so they cannot end up in logs or `Debug` output.

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;

/// Token kinds with their environment variable names
const TOKEN_VARIABLES: &[(&str, &str)] = &[
    ("identity", "PUBLISH_ID_TOKEN"),
    ("hosting", "PUBLISH_HOSTING_TOKEN"),
];

/// Where token values are looked up
#[derive(Clone, Default)]
enum TokenSource {
    #[default]
    Process,
    Map(HashMap<String, String>),
}

/// Secure token manager for identity and hosting authentication
///
/// # Examples
///
/// ```
/// use web_publisher::security::SecureTokenManager;
/// use std::collections::HashMap;
///
/// let env = HashMap::from([("PUBLISH_HOSTING_TOKEN".to_string(), "hst_0123456789".to_string())]);
/// let manager = SecureTokenManager::from_map(env);
/// assert!(manager.has_token("hosting"));
/// assert!(!manager.has_token("identity"));
/// ```
#[derive(Clone)]
pub struct SecureTokenManager {
    token_map: HashMap<String, String>,
    source: TokenSource,
}

impl Default for SecureTokenManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureTokenManager {
    /// Creates a manager reading the process environment
    pub fn new() -> Self {
        let token_map = TOKEN_VARIABLES
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self {
            token_map,
            source: TokenSource::Process,
        }
    }

    /// Creates a manager reading from a fixed variable map
    pub fn from_map(env: HashMap<String, String>) -> Self {
        Self {
            source: TokenSource::Map(env),
            ..Self::new()
        }
    }

    /// Retrieves a token by kind ("identity" or "hosting")
    ///
    /// Returns `None` if the kind is unknown or the variable is unset or blank.
    pub fn get_token(&self, kind: &str) -> Option<SecretString> {
        let variable = self.token_map.get(kind)?;
        let value = match &self.source {
            TokenSource::Process => env::var(variable).ok()?,
            TokenSource::Map(map) => map.get(variable)?.clone(),
        };

        if value.trim().is_empty() {
            return None;
        }

        Some(SecretString::new(value.into()))
    }

    pub fn has_token(&self, kind: &str) -> bool {
        self.get_token(kind).is_some()
    }

    /// Masks a token for safe logging
    ///
    /// Shows only the first 3 and last 3 characters for identification purposes.
    /// Tokens shorter than 10 characters are fully masked as "****".
    ///
    /// # Examples
    ///
    /// ```
    /// use web_publisher::security::SecureTokenManager;
    ///
    /// let manager = SecureTokenManager::new();
    /// assert_eq!(manager.mask_token("abcdef123456"), "abc...456");
    /// assert_eq!(manager.mask_token("short"), "****");
    /// ```
    pub fn mask_token(&self, token: &str) -> String {
        if token.chars().count() < 10 {
            return "****".to_string();
        }

        let prefix: String = token.chars().take(3).collect();
        let suffix: String = token
            .chars()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{}...{}", prefix, suffix)
    }

    /// Masks all known tokens in a string
    pub fn mask_tokens_in_string(&self, text: &str) -> String {
        let mut masked = text.to_string();

        for kind in self.token_map.keys() {
            if let Some(token) = self.get_token(kind) {
                let token_str = token.expose_secret();
                masked = masked.replace(token_str, &self.mask_token(token_str));
            }
        }

        masked
    }
}
