pub mod reuse_token_source;
pub mod user_token_source;

use std::fmt::{Debug, Formatter};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Error;
use crate::token::Token;

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Token, Error>;
}

impl Debug for dyn TokenSource {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "TokenSource")
    }
}

pub(crate) fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_default()
}

/// Wire format of a token endpoint response.
#[derive(Clone, Deserialize)]
pub(crate) struct InternalToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
}

impl InternalToken {
    pub(crate) fn to_token(&self, now: time::OffsetDateTime) -> Token {
        Token {
            access_token: self.access_token.clone(),
            token_type: self.token_type.clone(),
            expiry: self.expires_in.map(|s| now + time::Duration::seconds(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_token_expiry() {
        let internal: InternalToken = serde_json::from_str(
            r#"{"access_token": "ya29.secret", "token_type": "Bearer", "expires_in": 3599}"#,
        )
        .unwrap();
        let now = time::OffsetDateTime::now_utc();
        let token = internal.to_token(now);
        assert_eq!(Some(now + time::Duration::seconds(3599)), token.expiry);
        assert!(internal.refresh_token.is_none());
    }
}
