use crate::cache::StoredToken;
use crate::credentials::ClientSecrets;
use crate::error::Error;
use crate::token_source::{default_http_client, InternalToken};

/// Out-of-band redirect: the authorization code is displayed to the user
/// instead of being delivered to a local listener.
const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// The interactive half of the installed-application flow. The library
/// builds the consent URL and exchanges the resulting code; prompting the
/// user is left to the binary.
pub struct InstalledFlow {
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
    scopes: String,

    client: reqwest::Client,
}

impl InstalledFlow {
    pub fn new(secrets: &ClientSecrets, scopes: &[&str]) -> Self {
        Self {
            client_id: secrets.installed.client_id.clone(),
            client_secret: secrets.installed.client_secret.clone(),
            auth_uri: secrets.installed.auth_uri().to_string(),
            token_uri: secrets.installed.token_uri().to_string(),
            scopes: scopes.join(" "),
            client: default_http_client(),
        }
    }

    /// URL the user must open in a browser to grant consent.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&access_type=offline&prompt=consent",
            self.auth_uri,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(OOB_REDIRECT_URI),
            urlencoding::encode(&self.scopes),
        )
    }

    /// Exchanges the pasted authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken, Error> {
        let data = ExchangeBody {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            code: code.trim(),
            grant_type: "authorization_code",
            redirect_uri: OOB_REDIRECT_URI,
        };
        let response = self.client.post(&self.token_uri).json(&data).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::TokenResponse(status.as_u16(), response.text().await?));
        }
        let it = response.json::<InternalToken>().await?;
        let token = it.to_token(time::OffsetDateTime::now_utc());
        Ok(StoredToken::from_token(&token, it.refresh_token))
    }
}

#[derive(serde::Serialize)]
struct ExchangeBody<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub code: &'a str,
    pub grant_type: &'a str,
    pub redirect_uri: &'a str,
}
