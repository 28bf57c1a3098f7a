//! Bearer credentials for remote calls.
//!
//! The sync service never stores tokens itself. It asks a
//! [`TokenProvider`] at the start of each round and, when the remote
//! reports an expired credential, asks for exactly one refresh per round.

mod mock;

pub use mock::MockTokenProvider;

use async_trait::async_trait;

use crate::remote::RemoteError;

/// Opaque bearer credential.
///
/// Debug output never includes the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, for the remote store only.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential([REDACTED])")
    }
}

/// Source of bearer credentials.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current credential, or `None` when none is available.
    async fn get_token(&self) -> Option<Credential>;

    /// Obtain a fresh credential, replacing an expired one.
    async fn refresh_token(&self) -> Option<Credential>;

    /// Whether a remote failure means the credential has expired.
    fn is_expired_error(&self, error: &RemoteError) -> bool {
        matches!(error, RemoteError::CredentialExpired)
    }
}

/// Provider backed by a fixed token, used by the CLI.
///
/// Refreshing returns the same token, so an expired static token surfaces
/// as `AUTH_FAILURE` after the single retry.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    credential: Option<Credential>,
}

impl StaticTokenProvider {
    /// Provider that always returns `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            credential: Some(Credential::new(token)),
        }
    }

    /// Provider with no credential at all.
    pub fn none() -> Self {
        Self { credential: None }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self) -> Option<Credential> {
        self.credential.clone()
    }

    async fn refresh_token(&self) -> Option<Credential> {
        self.credential.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("super-secret-token");
        let debug = format!("{:?}", credential);

        assert!(!debug.contains("super-secret"), "got: {}", debug);
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn default_expiry_classification() {
        let provider = StaticTokenProvider::new("t");
        assert!(provider.is_expired_error(&RemoteError::CredentialExpired));
        assert!(!provider.is_expired_error(&RemoteError::Unauthorized("revoked".into())));
        assert!(!provider.is_expired_error(&RemoteError::Timeout));
    }

    #[tokio::test]
    async fn static_provider_returns_token() {
        let provider = StaticTokenProvider::new("abc");
        assert_eq!(provider.get_token().await.unwrap().as_str(), "abc");
        assert_eq!(provider.refresh_token().await.unwrap().as_str(), "abc");

        assert!(StaticTokenProvider::none().get_token().await.is_none());
    }
}
