use async_trait::async_trait;

use super::error::SentinelApiError;

/// Source of bearer tokens for the ARM management plane.
///
/// The client asks for a token on every request and never caches it;
/// validity and refresh belong to the implementation.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, SentinelApiError>;
}

/// Hands out a pre-acquired access token.
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

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, SentinelApiError> {
        if self.token.trim().is_empty() {
            return Err(SentinelApiError::AuthenticationError(
                "access token is empty".to_string(),
            ));
        }
        Ok(self.token.clone())
    }
}
