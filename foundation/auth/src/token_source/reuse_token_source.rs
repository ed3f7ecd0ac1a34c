use async_trait::async_trait;

use crate::cache::{StoredToken, TokenCache};
use crate::error::Error;
use crate::token::Token;
use crate::token_source::TokenSource;

/// Serves a cached token while it is valid and refreshes it through the
/// wrapped source when it is not. A freshly obtained token is written back
/// to the on-disk cache so the next process start skips the refresh.
pub struct ReuseTokenSource {
    target: Box<dyn TokenSource>,
    current_token: std::sync::RwLock<Token>,
    guard: tokio::sync::Mutex<()>,
    // cache file plus the refresh token to persist alongside new tokens
    write_back: Option<(TokenCache, String)>,
}

impl ReuseTokenSource {
    pub fn new(target: Box<dyn TokenSource>, token: Token, write_back: Option<(TokenCache, String)>) -> Self {
        Self {
            target,
            current_token: std::sync::RwLock::new(token),
            guard: tokio::sync::Mutex::new(()),
            write_back,
        }
    }

    fn r_lock_token(&self) -> Result<Token, Error> {
        let token = self.current_token.read().map_err(|_| Error::Poisoned)?;
        if token.valid() {
            Ok(token.clone())
        } else {
            Err(Error::InvalidToken)
        }
    }
}

#[async_trait]
impl TokenSource for ReuseTokenSource {
    async fn token(&self) -> Result<Token, Error> {
        if let Ok(token) = self.r_lock_token() {
            return Ok(token);
        }

        // Only a single task refreshes the token.
        let _locking = self.guard.lock().await;

        if let Ok(token) = self.r_lock_token() {
            return Ok(token);
        }

        let token = self.target.token().await?;
        tracing::debug!("token refresh success : expiry={:?}", token.expiry);
        *self.current_token.write().map_err(|_| Error::Poisoned)? = token.clone();

        if let Some((cache, refresh_token)) = &self.write_back {
            let stored = StoredToken::from_token(&token, Some(refresh_token.clone()));
            if let Err(e) = cache.store(&stored).await {
                tracing::warn!("failed to persist refreshed token: {}", e);
            }
        }
        Ok(token)
    }
}
