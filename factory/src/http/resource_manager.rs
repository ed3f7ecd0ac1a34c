use std::sync::Arc;

use reqwest::Client;
use sa_factory_auth::token_source::TokenSource;
use sa_factory_batch::{BatchItem, BatchRequest};

use crate::http::{check_response_status, Error, USER_AGENT};
use crate::model::{ListProjectsResponse, Operation, Project};

pub const ENDPOINT: &str = "https://cloudresourcemanager.googleapis.com";

/// Client for the Cloud Resource Manager v1 API.
#[derive(Clone)]
pub struct ResourceManagerClient {
    ts: Arc<dyn TokenSource>,
    http: Client,
    endpoint: String,
}

impl ResourceManagerClient {
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

    /// Lists every project visible to the authenticated principal.
    pub async fn list_projects(&self) -> Result<Vec<Project>, Error> {
        let token = self.ts.token().await?;
        let response = self
            .http
            .get(format!("{}/v1/projects", self.endpoint))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::AUTHORIZATION, token.value())
            .send()
            .await?;
        let response = check_response_status(response).await?;
        let list = response.json::<ListProjectsResponse>().await?;
        Ok(list.projects.unwrap_or_default())
    }

    /// Fetches the current state of a long-running operation by name.
    pub async fn get_operation(&self, name: &str) -> Result<Operation, Error> {
        let token = self.ts.token().await?;
        let response = self
            .http
            .get(format!("{}/v1/{}", self.endpoint, name))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::AUTHORIZATION, token.value())
            .send()
            .await?;
        let response = check_response_status(response).await?;
        Ok(response.json::<Operation>().await?)
    }

    pub fn batch(&self) -> BatchRequest {
        BatchRequest::new(format!("{}/batch", self.endpoint))
    }

    pub fn add_create_project(batch: &mut BatchRequest, project_id: &str) {
        batch.add(
            reqwest::Method::POST,
            "/v1/projects",
            Some(serde_json::json!({ "projectId": project_id })),
        );
    }

    pub async fn execute_batch(&self, batch: BatchRequest) -> Result<Vec<BatchItem>, Error> {
        let token = self.ts.token().await?;
        Ok(batch.execute(&self.http, &token.value()).await?)
    }
}
