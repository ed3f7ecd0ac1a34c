use async_trait::async_trait;

use crate::credentials::InstalledApp;
use crate::error::Error;
use crate::token::Token;
use crate::token_source::{default_http_client, InternalToken, TokenSource};

/// Exchanges a stored refresh token for a fresh access token.
#[derive(Debug)]
pub struct UserRefreshTokenSource {
    client_id: String,
    client_secret: String,
    token_url: String,
    refresh_token: String,

    client: reqwest::Client,
}

impl UserRefreshTokenSource {
    pub fn new(app: &InstalledApp, refresh_token: &str) -> Self {
        Self {
            client_id: app.client_id.clone(),
            client_secret: app.client_secret.clone(),
            token_url: app.token_uri().to_string(),
            refresh_token: refresh_token.to_string(),
            client: default_http_client(),
        }
    }
}

#[derive(serde::Serialize)]
struct RequestBody<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub grant_type: &'a str,
    pub refresh_token: &'a str,
}

#[async_trait]
impl TokenSource for UserRefreshTokenSource {
    async fn token(&self) -> Result<Token, Error> {
        let data = RequestBody {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            grant_type: "refresh_token",
            refresh_token: &self.refresh_token,
        };

        let response = self.client.post(&self.token_url).json(&data).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::TokenResponse(status.as_u16(), response.text().await?));
        }
        let it = response.json::<InternalToken>().await?;
        Ok(it.to_token(time::OffsetDateTime::now_utc()))
    }
}
