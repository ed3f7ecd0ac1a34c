use std::path::Path;

use serde::Deserialize;
use tokio::fs;

use crate::error::Error;
use crate::token::TOKEN_URL;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// The `installed` section of a Google client secrets file, as downloaded
/// from the cloud console for a desktop application.
#[allow(dead_code)]
#[derive(Deserialize, Clone, PartialEq)]
#[cfg_attr(test, derive(Debug))]
pub struct InstalledApp {
    pub client_id: String,
    pub client_secret: String,
    pub project_id: Option<String>,
    pub auth_uri: Option<String>,
    pub token_uri: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
}

impl InstalledApp {
    pub fn auth_uri(&self) -> &str {
        self.auth_uri.as_deref().unwrap_or(DEFAULT_AUTH_URI)
    }

    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(TOKEN_URL)
    }
}

#[derive(Deserialize, Clone, PartialEq)]
#[cfg_attr(test, derive(Debug))]
pub struct ClientSecrets {
    pub installed: InstalledApp,
}

impl ClientSecrets {
    pub async fn new_from_file(filepath: impl AsRef<Path>) -> Result<Self, Error> {
        let secrets_json = fs::read(filepath.as_ref()).await?;
        Ok(serde_json::from_slice(secrets_json.as_slice())?)
    }

    pub fn new_from_str(s: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(s)?)
    }

    /// Project the OAuth client itself belongs to, used to bootstrap API
    /// enablement when listing projects is denied.
    pub fn project_id(&self) -> Option<&str> {
        self.installed.project_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;

    use tempfile::tempdir;

    use super::*;

    const SECRETS_FILE_CONTENT: &str = r#"{
  "installed": {
    "client_id": "123456789010-abcdefg.apps.googleusercontent.com",
    "project_id": "fake-project-id",
    "auth_uri": "https://accounts.google.com/o/oauth2/auth",
    "token_uri": "https://oauth2.googleapis.com/token",
    "auth_provider_x509_cert_url": "https://www.googleapis.com/oauth2/v1/certs",
    "client_secret": "fake-client-secret",
    "redirect_uris": ["urn:ietf:wg:oauth:2.0:oob", "http://localhost"]
  }
}"#;

    #[tokio::test]
    async fn test_client_secrets_new_from_file() {
        let temp_dir = tempdir().expect("Cannot create temporary directory");
        let temp_path = temp_dir.path().join("credentials.json");
        let mut secrets_file = File::create(&temp_path).expect("Cannot create temporary file");
        secrets_file
            .write_all(SECRETS_FILE_CONTENT.as_bytes())
            .expect("Cannot write content to file");

        let secrets = ClientSecrets::new_from_file(&temp_path).await.unwrap();
        let expected = ClientSecrets::new_from_str(SECRETS_FILE_CONTENT).unwrap();
        assert_eq!(expected, secrets);
        assert_eq!(Some("fake-project-id"), secrets.project_id());
    }

    #[test]
    fn test_client_secrets_defaults() {
        let secrets = ClientSecrets::new_from_str(
            r#"{"installed": {"client_id": "id", "client_secret": "secret"}}"#,
        )
        .unwrap();
        assert_eq!(DEFAULT_AUTH_URI, secrets.installed.auth_uri());
        assert_eq!(TOKEN_URL, secrets.installed.token_uri());
    }
}
