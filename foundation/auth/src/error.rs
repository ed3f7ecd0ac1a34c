#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("interactive authorization is required; no cached refresh token was found")]
    AuthorizationRequired,

    #[error("refresh token is required for user account credentials")]
    RefreshTokenIsRequired,

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    HttpError(#[from] reqwest::Error),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error("token server responded with status {0}: {1}")]
    TokenResponse(u16, String),

    #[error("cached token store poisoned")]
    Poisoned,

    #[error("invalid token")]
    InvalidToken,
}
