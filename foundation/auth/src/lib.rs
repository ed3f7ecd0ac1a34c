pub mod cache;
pub mod credentials;
pub mod error;
pub mod flow;
pub mod token;
pub mod token_source;

use crate::cache::TokenCache;
use crate::credentials::ClientSecrets;
use crate::token_source::reuse_token_source::ReuseTokenSource;
use crate::token_source::user_token_source::UserRefreshTokenSource;
use crate::token_source::TokenSource;

/// Scopes required by the factory: Drive for sharing, cloud-platform for
/// project management, IAM for service accounts and keys.
pub const SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/iam",
];

/// Builds a token source from a previously cached authorization.
///
/// Returns [`error::Error::AuthorizationRequired`] when no cached refresh
/// token exists; the caller is expected to run the interactive
/// [`flow::InstalledFlow`] and persist its result before retrying.
pub async fn create_token_source(
    secrets: &ClientSecrets,
    cache: &TokenCache,
) -> Result<Box<dyn TokenSource>, error::Error> {
    let stored = match cache.load().await? {
        Some(stored) => stored,
        None => return Err(error::Error::AuthorizationRequired),
    };
    let refresh_token = match &stored.refresh_token {
        Some(refresh_token) => refresh_token.clone(),
        None => return Err(error::Error::AuthorizationRequired),
    };
    let target = UserRefreshTokenSource::new(&secrets.installed, &refresh_token);
    let initial = stored.to_token();
    Ok(Box::new(ReuseTokenSource::new(
        Box::new(target),
        initial,
        Some((cache.clone(), refresh_token)),
    )))
}
