use std::sync::Arc;

use reqwest::Client;
use sa_factory_auth::token_source::TokenSource;
use sa_factory_batch::{BatchItem, BatchRequest};

use crate::http::Error;

/// The Drive v3 homogeneous batch endpoint.
pub const BATCH_ENDPOINT: &str = "https://www.googleapis.com/batch/drive/v3";

/// Drive refuses batches above this size.
pub const MAX_BATCH_SIZE: usize = 100;

/// Client for the Drive v3 permissions API, used to add exported service
/// accounts as members of a shared drive.
#[derive(Clone)]
pub struct DriveClient {
    ts: Arc<dyn TokenSource>,
    http: Client,
    batch_endpoint: String,
}

impl DriveClient {
    pub fn new(ts: Arc<dyn TokenSource>, http: Client) -> Self {
        Self::with_endpoint(ts, http, BATCH_ENDPOINT)
    }

    pub fn with_endpoint(ts: Arc<dyn TokenSource>, http: Client, batch_endpoint: &str) -> Self {
        Self {
            ts,
            http,
            batch_endpoint: batch_endpoint.to_string(),
        }
    }

    pub fn batch(&self) -> BatchRequest {
        BatchRequest::new(self.batch_endpoint.clone())
    }

    /// Grants `email` organizer rights on the shared drive `file_id`.
    pub fn add_create_permission(batch: &mut BatchRequest, file_id: &str, email: &str) {
        batch.add(
            reqwest::Method::POST,
            format!("/drive/v3/files/{file_id}/permissions?supportsAllDrives=true"),
            Some(serde_json::json!({
                "role": "fileOrganizer",
                "type": "user",
                "emailAddress": email,
            })),
        );
    }

    pub async fn execute_batch(&self, batch: BatchRequest) -> Result<Vec<BatchItem>, Error> {
        let token = self.ts.token().await?;
        Ok(batch.execute(&self.http, &token.value()).await?)
    }
}
