//! Identity and hosting credentials from configuration and environment

use secrecy::SecretString;

use crate::core::traits::{CredentialProvider, IdentityProvider};
use crate::security::SecureTokenManager;

/// Identity with a configured creator handle
///
/// The session is valid while an identity token is present.
pub struct StaticIdentity {
    creator_handle: Option<String>,
    tokens: SecureTokenManager,
}

impl StaticIdentity {
    pub fn new(creator_handle: Option<String>, tokens: SecureTokenManager) -> Self {
        Self {
            creator_handle: creator_handle.filter(|h| !h.trim().is_empty()),
            tokens,
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn is_authenticated(&self) -> bool {
        self.tokens.has_token("identity")
    }

    fn creator_handle(&self) -> Option<String> {
        self.creator_handle.clone()
    }

    fn id_token(&self) -> Option<SecretString> {
        self.tokens.get_token("identity")
    }
}

/// Hosting credential read from `PUBLISH_HOSTING_TOKEN`
pub struct EnvCredentialProvider {
    tokens: SecureTokenManager,
}

impl EnvCredentialProvider {
    pub fn new(tokens: SecureTokenManager) -> Self {
        Self { tokens }
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn has_valid_credential(&self) -> bool {
        self.tokens.has_token("hosting")
    }
}
