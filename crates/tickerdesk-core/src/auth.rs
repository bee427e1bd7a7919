//! Session token source.
//!
//! The client asks its [`TokenProvider`] for a token before every attempt
//! and never keeps one between requests, so a refreshed session is picked
//! up immediately.

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::http_client::HttpAuth;

pub trait TokenProvider: Send + Sync + Debug {
    /// Current bearer token, or `None` for an anonymous session.
    fn token<'a>(&'a self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
}

/// Provider returning a fixed token, e.g. from `TICKERDESK_TOKEN`.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl TokenProvider for StaticTokenProvider {
    fn token<'a>(&'a self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async move { Some(self.token.clone()) })
    }
}

/// Resolve the auth to attach to one attempt.
pub(crate) async fn resolve_auth(provider: Option<&dyn TokenProvider>) -> HttpAuth {
    match provider {
        Some(provider) => match provider.token().await {
            Some(token) if !token.trim().is_empty() => HttpAuth::BearerToken(token),
            _ => HttpAuth::None,
        },
        None => HttpAuth::None,
    }
}
