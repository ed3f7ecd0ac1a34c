use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::Error;
use crate::token::Token;

/// Serialized form of an authorization, persisted between runs so the
/// interactive consent flow only has to happen once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredToken {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    /// Expiry as a unix timestamp; absent for tokens that never expire.
    pub expiry: Option<i64>,
}

impl StoredToken {
    pub fn from_token(token: &Token, refresh_token: Option<String>) -> Self {
        Self {
            access_token: token.access_token.clone(),
            token_type: token.token_type.clone(),
            refresh_token,
            expiry: token.expiry.map(|e| e.unix_timestamp()),
        }
    }

    pub fn to_token(&self) -> Token {
        Token {
            access_token: self.access_token.clone(),
            token_type: self.token_type.clone(),
            expiry: self
                .expiry
                .and_then(|e| time::OffsetDateTime::from_unix_timestamp(e).ok()),
        }
    }
}

/// A token cache backed by a JSON file at a caller-chosen path.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cached authorization, or `None` when the file does not
    /// exist yet.
    pub async fn load(&self) -> Result<Option<StoredToken>, Error> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(bytes.as_slice())?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn store(&self, token: &StoredToken) -> Result<(), Error> {
        let json = serde_json::to_vec_pretty(token)?;
        fs::write(&self.path, json).await?;
        Ok(())
    }
}
