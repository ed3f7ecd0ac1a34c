//! Key export and the tools that consume the exported directory.

use std::path::{Path, PathBuf};

use sa_factory_batch::BatchItem;
use serde::Deserialize;

use crate::error::Error;
use crate::factory::ServiceAccountFactory;
use crate::http::drive::{DriveClient, MAX_BATCH_SIZE};
use crate::http::iam::IamClient;
use crate::model::ServiceAccountKey;

impl ServiceAccountFactory {
    /// Exports one key per service account for every target project into
    /// `dir`, as files named by a zero-based running index. Returns the
    /// number of keys written.
    ///
    /// Export is all-or-nothing per project round: a round only counts
    /// when every key request in the batch succeeded, otherwise the whole
    /// round is discarded and retried after a backoff pause.
    pub async fn download_keys(&self, projects: &[String], dir: &Path) -> Result<usize, Error> {
        tokio::fs::create_dir_all(dir).await?;
        let mut index = 0usize;
        for project in projects {
            let keys = self.collect_project_keys(project).await?;
            for key in &keys {
                let path = dir.join(format!("{index}.json"));
                tokio::fs::write(&path, &key.private_key_data).await?;
                index += 1;
            }
            tracing::info!(project, keys = keys.len(), "exported keys");
        }
        Ok(index)
    }

    async fn collect_project_keys(&self, project: &str) -> Result<Vec<ServiceAccountKey>, Error> {
        let config = self.config();
        for round in 0..config.max_key_rounds {
            if round > 0 {
                tokio::time::sleep(config.rate_limit_backoff).await;
            }
            let accounts = self.list_service_accounts(project).await?;
            if accounts.is_empty() {
                tracing::warn!(project, "no service accounts to export");
                return Ok(Vec::new());
            }
            tracing::info!(project, round, accounts = accounts.len(), "requesting keys");

            let mut batch = self.iam().batch();
            for account in &accounts {
                IamClient::add_create_key(&mut batch, project, &account.unique_id);
            }
            let items = self.iam().execute_batch(batch).await?;

            if let Some(keys) = accept_round(items, accounts.len()) {
                return Ok(keys);
            }
            tracing::warn!(project, round, "discarding partial key batch");
        }
        Err(Error::KeyExportTimeout {
            project: project.to_string(),
            rounds: config.max_key_rounds,
        })
    }
}

/// A round is accepted only when every item decoded and the key count
/// matches the account count; anything less yields nothing.
fn accept_round(items: Vec<BatchItem>, expected: usize) -> Option<Vec<ServiceAccountKey>> {
    let mut keys = Vec::with_capacity(items.len());
    for item in items {
        match item.into_result::<ServiceAccountKey>() {
            Ok(key) => keys.push(key),
            Err(e) => {
                tracing::warn!("key request failed: {e}");
                return None;
            }
        }
    }
    if keys.len() == expected {
        Some(keys)
    } else {
        None
    }
}

/// The subset of an exported credentials file the tools care about.
#[derive(Clone, Debug, Deserialize)]
pub struct KeyFile {
    pub client_email: String,
}

/// Reads `client_email` out of every `*.json` key file in `dir`, in
/// index order.
pub async fn read_key_emails(dir: &Path) -> Result<Vec<String>, Error> {
    let mut paths: Vec<PathBuf> = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort_by_key(|path| {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        (stem.parse::<u64>().unwrap_or(u64::MAX), stem)
    });

    let mut emails = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(&path).await?;
        let key: KeyFile = serde_json::from_slice(&bytes)?;
        emails.push(key.client_email);
    }
    Ok(emails)
}

/// Grants every e-mail organizer access on the shared drive, batching at
/// most [`MAX_BATCH_SIZE`] grants per round trip. Returns the number of
/// grants that succeeded.
pub async fn share_drive(drive: &DriveClient, drive_id: &str, emails: &[String]) -> Result<usize, Error> {
    let mut granted = 0usize;
    for chunk in emails.chunks(MAX_BATCH_SIZE) {
        let mut batch = drive.batch();
        for email in chunk {
            DriveClient::add_create_permission(&mut batch, drive_id, email);
        }
        let items = drive.execute_batch(batch).await?;
        for item in items {
            if item.is_success() {
                granted += 1;
            } else if let Some(error) = item.error() {
                tracing::warn!(code = error.code, "permission grant failed: {}", error.message);
            }
        }
    }
    Ok(granted)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sa_factory_auth::token_source::TokenSource;
    use tempfile::tempdir;

    use crate::testutil::{StaticTokenSource, StubResponse, StubServer};

    use super::*;

    fn key_item(id: usize) -> BatchItem {
        // "{}" base64-encoded; the payload content is opaque here.
        BatchItem::new(
            id,
            200,
            format!(
                r#"{{"name": "projects/p/serviceAccounts/u{id}/keys/k", "privateKeyData": "e30="}}"#
            ),
        )
    }

    #[test]
    fn test_full_round_is_accepted() {
        let items = (0..3).map(key_item).collect();
        let keys = accept_round(items, 3).unwrap();
        assert_eq!(3, keys.len());
        assert_eq!(b"{}".to_vec(), keys[0].private_key_data);
    }

    #[test]
    fn test_one_failure_discards_the_round() {
        let mut items: Vec<BatchItem> = (0..99).map(key_item).collect();
        items.push(BatchItem::new(
            99,
            429,
            r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#,
        ));
        assert!(accept_round(items, 100).is_none());
    }

    #[test]
    fn test_count_mismatch_discards_the_round() {
        let items = (0..2).map(key_item).collect();
        assert!(accept_round(items, 3).is_none());
    }

    #[tokio::test]
    async fn test_share_drive_counts_only_successful_grants() {
        let reply = [
            "--batch_x",
            "Content-Type: application/http",
            "Content-ID: <response-item0>",
            "",
            "HTTP/1.1 200 OK",
            "Content-Type: application/json",
            "",
            r#"{"id": "perm0", "role": "fileOrganizer"}"#,
            "--batch_x",
            "Content-Type: application/http",
            "Content-ID: <response-item1>",
            "",
            "HTTP/1.1 403 Forbidden",
            "Content-Type: application/json",
            "",
            r#"{"error": {"code": 403, "message": "denied", "status": "PERMISSION_DENIED"}}"#,
            "--batch_x--",
            "",
        ]
        .join("\r\n");
        let server = StubServer::start(vec![StubResponse::multipart("batch_x", reply)]).await;
        let ts: Arc<dyn TokenSource> = Arc::new(StaticTokenSource);
        let drive = DriveClient::with_endpoint(ts, reqwest::Client::new(), &server.endpoint);
        let emails = vec!["a@p.iam".to_string(), "b@p.iam".to_string()];

        let granted = share_drive(&drive, "drive1", &emails).await.unwrap();
        assert_eq!(1, granted);

        let requests = server.requests();
        assert_eq!(1, requests.len());
        assert_eq!(2, requests[0].body.matches("supportsAllDrives=true").count());
    }

    #[tokio::test]
    async fn test_read_key_emails_in_index_order() {
        let dir = tempdir().unwrap();
        for (index, email) in [(0, "a@p.iam"), (2, "c@p.iam"), (10, "k@p.iam")] {
            std::fs::write(
                dir.path().join(format!("{index}.json")),
                format!(r#"{{"type": "service_account", "client_email": "{email}"}}"#),
            )
            .unwrap();
        }
        // Non-JSON files are ignored.
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let emails = read_key_emails(dir.path()).await.unwrap();
        assert_eq!(vec!["a@p.iam", "c@p.iam", "k@p.iam"], emails);
    }
}
