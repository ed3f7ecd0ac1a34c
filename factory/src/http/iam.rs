use std::sync::Arc;

use reqwest::Client;
use sa_factory_auth::token_source::TokenSource;
use sa_factory_batch::{BatchItem, BatchRequest};

use crate::http::{check_response_status, Error, USER_AGENT};
use crate::model::{ListServiceAccountsResponse, ServiceAccount};

pub const ENDPOINT: &str = "https://iam.googleapis.com";

/// One page is the whole story: a project never holds more accounts than
/// the cap, so a single `pageSize=100` listing is exhaustive.
pub const LIST_PAGE_SIZE: usize = 100;

/// Client for the IAM v1 service account API.
#[derive(Clone)]
pub struct IamClient {
    ts: Arc<dyn TokenSource>,
    http: Client,
    endpoint: String,
}

impl IamClient {
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

    pub async fn list_service_accounts(&self, project: &str) -> Result<Vec<ServiceAccount>, Error> {
        let token = self.ts.token().await?;
        let response = self
            .http
            .get(format!(
                "{}/v1/projects/{}/serviceAccounts",
                self.endpoint, project
            ))
            .query(&[("pageSize", LIST_PAGE_SIZE)])
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::AUTHORIZATION, token.value())
            .send()
            .await?;
        let response = check_response_status(response).await?;
        let list = response.json::<ListServiceAccountsResponse>().await?;
        Ok(list.accounts.unwrap_or_default())
    }

    pub fn batch(&self) -> BatchRequest {
        BatchRequest::new(format!("{}/batch", self.endpoint))
    }

    pub fn add_create_account(batch: &mut BatchRequest, project: &str, account_id: &str) {
        batch.add(
            reqwest::Method::POST,
            format!("/v1/projects/{project}/serviceAccounts"),
            Some(serde_json::json!({
                "accountId": account_id,
                "serviceAccount": { "displayName": account_id },
            })),
        );
    }

    /// `name` is the account's full resource name.
    pub fn add_delete_account(batch: &mut BatchRequest, name: &str) {
        batch.add(reqwest::Method::DELETE, format!("/v1/{name}"), None);
    }

    /// Requests a downloadable credentials-file key for one account.
    pub fn add_create_key(batch: &mut BatchRequest, project: &str, unique_id: &str) {
        batch.add(
            reqwest::Method::POST,
            format!("/v1/projects/{project}/serviceAccounts/{unique_id}/keys"),
            Some(serde_json::json!({
                "privateKeyType": "TYPE_GOOGLE_CREDENTIALS_FILE",
                "keyAlgorithm": "KEY_ALG_RSA_2048",
            })),
        );
    }

    pub async fn execute_batch(&self, batch: BatchRequest) -> Result<Vec<BatchItem>, Error> {
        let token = self.ts.token().await?;
        Ok(batch.execute(&self.http, &token.value()).await?)
    }
}
