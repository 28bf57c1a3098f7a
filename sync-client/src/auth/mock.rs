//! Mock token provider for testing.

use super::{Credential, TokenProvider};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock token provider for testing.
///
/// Returns a current token and scripted refresh results, and counts calls.
#[derive(Debug, Default)]
pub struct MockTokenProvider {
    inner: Arc<Mutex<MockTokenInner>>,
}

#[derive(Debug, Default)]
struct MockTokenInner {
    current: Option<Credential>,
    refresh_results: VecDeque<Option<Credential>>,
    get_calls: usize,
    refresh_calls: usize,
}

impl MockTokenProvider {
    /// Provider whose current token is `token`.
    pub fn new(token: &str) -> Self {
        let provider = Self::default();
        provider.set_token(Some(token));
        provider
    }

    /// Provider with no current token.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Replace the current token.
    pub fn set_token(&self, token: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        inner.current = token.map(Credential::new);
    }

    /// Queue the result of the next `refresh_token()` call.
    ///
    /// A successful refresh also becomes the current token. With nothing
    /// queued, refresh returns `None`.
    pub fn queue_refresh(&self, token: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        inner.refresh_results.push_back(token.map(Credential::new));
    }

    /// Number of `get_token()` calls.
    pub fn get_calls(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.get_calls
    }

    /// Number of `refresh_token()` calls.
    pub fn refresh_calls(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.refresh_calls
    }
}

impl Clone for MockTokenProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn get_token(&self) -> Option<Credential> {
        let mut inner = self.inner.lock().unwrap();
        inner.get_calls += 1;
        inner.current.clone()
    }

    async fn refresh_token(&self) -> Option<Credential> {
        let mut inner = self.inner.lock().unwrap();
        inner.refresh_calls += 1;
        let refreshed = inner.refresh_results.pop_front().flatten();
        if refreshed.is_some() {
            inner.current = refreshed.clone();
        }
        refreshed
    }
}
