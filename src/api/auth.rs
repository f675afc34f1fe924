//! Bearer-token sources injected into [`ApiClient`](super::ApiClient)

use std::env;

/// Supplies the bearer token for each request
pub trait TokenSource: Send + Sync {
    /// Token to send, or `None` to make the request unauthenticated
    fn bearer_token(&self) -> Option<String>;
}

/// No authentication header
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl TokenSource for NoAuth {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// Fixed token, e.g. from a CLI flag or tests
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.clone())
        }
    }
}

/// Token read from an environment variable on every request, so a refreshed
/// value is picked up without rebuilding the client
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var_name(&self) -> &str {
        &self.var
    }
}

impl TokenSource for EnvToken {
    fn bearer_token(&self) -> Option<String> {
        env::var(&self.var).ok().filter(|t| !t.trim().is_empty())
    }
}
