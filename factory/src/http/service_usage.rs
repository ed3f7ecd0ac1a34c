use std::sync::Arc;

use reqwest::Client;
use sa_factory_auth::token_source::TokenSource;
use sa_factory_batch::{BatchItem, BatchRequest};

use crate::http::{check_response_status, Error, USER_AGENT};

pub const ENDPOINT: &str = "https://serviceusage.googleapis.com";

/// Client for the Service Usage v1 API.
#[derive(Clone)]
pub struct ServiceUsageClient {
    ts: Arc<dyn TokenSource>,
    http: Client,
    endpoint: String,
}

impl ServiceUsageClient {
    pub fn new(ts: Arc<dyn TokenSource>, http: Client) -> Self {
        Self::with_endpoint(ts, http, ENDPOINT)
    }

    pub fn with_endpoint(ts: Arc<dyn TokenSource>, http: Client, endpoint: &str) -> Self {
        Self {
            ts,
            http,
            endpoint: endpoint.to_string(),
        }
    }

    /// Enables one service directly, outside a batch. Used to switch on
    /// the Resource Manager API for the OAuth client's own project when
    /// the very first listing is denied.
    pub async fn enable_service(&self, project: &str, service: &str) -> Result<(), Error> {
        let token = self.ts.token().await?;
        let response = self
            .http
            .post(format!(
                "{}/v1/projects/{}/services/{}:enable",
                self.endpoint, project, service
            ))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::AUTHORIZATION, token.value())
            .json(&serde_json::json!({}))
            .send()
            .await?;
        check_response_status(response).await?;
        Ok(())
    }

    pub fn batch(&self) -> BatchRequest {
        BatchRequest::new(format!("{}/batch", self.endpoint))
    }

    pub fn add_enable_service(batch: &mut BatchRequest, project: &str, service: &str) {
        batch.add(
            reqwest::Method::POST,
            format!("/v1/projects/{project}/services/{service}:enable"),
            Some(serde_json::json!({})),
        );
    }

    pub async fn execute_batch(&self, batch: BatchRequest) -> Result<Vec<BatchItem>, Error> {
        let token = self.ts.token().await?;
        Ok(batch.execute(&self.http, &token.value()).await?)
    }
}
