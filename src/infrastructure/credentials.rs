//! Bearer credential verification.
//!
//! Token issuance lives elsewhere. This module only answers "which owner
//! does this token belong to".

use std::collections::HashMap;

use crate::domain::OwnerId;

use super::config::ConfigError;

/// Resolves a bearer token to the owner it was issued for.
pub trait CredentialVerifier: Send + Sync {
    /// Returns the owner for `token`, or `None` if the token is unknown.
    fn verify(&self, token: &str) -> Option<OwnerId>;
}

/// A fixed token table, typically loaded from `AUTH_TOKENS`.
#[derive(Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, OwnerId>,
}

impl StaticTokenVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token for `owner`, replacing any previous mapping of the token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, owner: OwnerId) -> Self {
        self.tokens.insert(token.into(), owner);
        self
    }

    /// Parses a comma separated list of `token=owner` pairs.
    ///
    /// Whitespace around entries and around each side of `=` is ignored, as
    /// are empty entries (a trailing comma, for instance).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidAuthToken` for an entry without `=` or
    /// with an empty side.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .try_fold(Self::new(), |verifier, entry| {
                let (token, owner) = entry
                    .split_once('=')
                    .map(|(token, owner)| (token.trim(), owner.trim()))
                    .filter(|(token, owner)| !token.is_empty() && !owner.is_empty())
                    .ok_or_else(|| ConfigError::InvalidAuthToken(entry.to_string()))?;
                Ok(verifier.with_token(token, OwnerId::new(owner)))
            })
    }

    /// Number of known tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl CredentialVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Option<OwnerId> {
        self.tokens.get(token).cloned()
    }
}

impl std::fmt::Debug for StaticTokenVerifier {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("StaticTokenVerifier")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}
