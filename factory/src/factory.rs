use std::sync::Arc;
use std::time::Duration;

use sa_factory_auth::token_source::TokenSource;
use sa_factory_batch::{BatchItem, RATE_LIMIT_BACKOFF};

use crate::error::Error;
use crate::http::iam::IamClient;
use crate::http::resource_manager::ResourceManagerClient;
use crate::http::service_usage::ServiceUsageClient;
use crate::id::generate_id;
use crate::model::{Operation, ServiceAccount};
use crate::operation::OperationPoller;
use crate::target::TargetSelector;

#[derive(Clone, Debug)]
pub struct FactoryConfig {
    /// Hard ceiling on projects the principal may hold.
    pub max_projects: usize,
    /// Provider quota: service accounts per project.
    pub account_cap: usize,
    pub project_prefix: String,
    pub account_prefix: String,
    pub poller: OperationPoller,
    /// Fixed pause after observing a rate-limited batch item.
    pub rate_limit_backoff: Duration,
    /// Bound on account-creation rounds per project.
    pub max_fill_rounds: usize,
    /// Bound on key-export rounds per project.
    pub max_key_rounds: usize,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            max_projects: 12,
            account_cap: 100,
            project_prefix: "saf-".to_string(),
            account_prefix: "saf-".to_string(),
            poller: OperationPoller::default(),
            rate_limit_backoff: RATE_LIMIT_BACKOFF,
            max_fill_rounds: 20,
            max_key_rounds: 50,
        }
    }
}

/// Sequential orchestration over the three management APIs: one batch in
/// flight at a time, one operation polled at a time.
pub struct ServiceAccountFactory {
    resource_manager: ResourceManagerClient,
    iam: IamClient,
    service_usage: ServiceUsageClient,
    config: FactoryConfig,
}

impl ServiceAccountFactory {
    pub fn new(ts: Arc<dyn TokenSource>, config: FactoryConfig) -> Self {
        let http = reqwest::Client::new();
        Self {
            resource_manager: ResourceManagerClient::new(ts.clone(), http.clone()),
            iam: IamClient::new(ts.clone(), http.clone()),
            service_usage: ServiceUsageClient::new(ts, http),
            config,
        }
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn service_usage(&self) -> &ServiceUsageClient {
        &self.service_usage
    }

    /// Ids of every project visible to the principal.
    pub async fn list_projects(&self) -> Result<Vec<String>, Error> {
        let projects = self.resource_manager.list_projects().await?;
        Ok(projects.into_iter().map(|p| p.project_id).collect())
    }

    pub async fn list_service_accounts(&self, project: &str) -> Result<Vec<ServiceAccount>, Error> {
        Ok(self.iam.list_service_accounts(project).await?)
    }

    /// Maps a selector to concrete project ids, listing live projects
    /// only when the selector asks for all of them.
    pub async fn resolve_targets(
        &self,
        selector: &TargetSelector,
        created_this_run: &[String],
    ) -> Result<Vec<String>, Error> {
        Ok(match selector {
            TargetSelector::All => selector.resolve(created_this_run, &self.list_projects().await?),
            _ => selector.resolve(created_this_run, &[]),
        })
    }

    /// Creates `count` projects and blocks until every creation operation
    /// completes. Fails up front, creating nothing, when the request would
    /// exceed `max_projects`.
    pub async fn create_projects(&self, count: usize) -> Result<Vec<String>, Error> {
        let existing = self.list_projects().await?;
        if existing.len() + count > self.config.max_projects {
            return Err(Error::ProjectQuotaExceeded {
                requested: count,
                existing: existing.len(),
                maximum: self.config.max_projects,
            });
        }

        let ids: Vec<String> = (0..count)
            .map(|_| generate_id(&self.config.project_prefix))
            .collect();
        tracing::info!(count, "creating projects");

        let mut batch = self.resource_manager.batch();
        for id in &ids {
            ResourceManagerClient::add_create_project(&mut batch, id);
        }
        let items = self.resource_manager.execute_batch(batch).await?;

        let mut operations = Vec::with_capacity(count);
        for item in self.absorb_failures(items).await {
            match item.into_result::<Operation>() {
                Ok(operation) => operations.push(operation),
                Err(e) => tracing::warn!("undecodable project creation response: {e}"),
            }
        }
        for operation in &operations {
            self.config
                .poller
                .wait(&self.resource_manager, &operation.name)
                .await?;
        }
        tracing::info!(completed = operations.len(), "project creation finished");
        Ok(ids)
    }

    /// Enables every service on every target project in a single batch.
    /// Service names must be fully qualified (`iam.googleapis.com`).
    pub async fn enable_services(&self, projects: &[String], services: &[String]) -> Result<(), Error> {
        let mut batch = self.service_usage.batch();
        for project in projects {
            for service in services {
                ServiceUsageClient::add_enable_service(&mut batch, project, service);
            }
        }
        if batch.is_empty() {
            return Ok(());
        }
        tracing::info!(
            projects = projects.len(),
            services = services.len(),
            "enabling services"
        );
        let items = self.service_usage.execute_batch(batch).await?;
        self.absorb_failures(items).await;
        Ok(())
    }

    /// Tops the project up to the account cap. Each round re-reads the
    /// live count, so partial batch failures are absorbed by the next
    /// round and the cap is never overshot.
    pub async fn create_remaining_accounts(&self, project: &str) -> Result<(), Error> {
        let cap = self.config.account_cap;
        for _round in 0..self.config.max_fill_rounds {
            let existing = self.list_service_accounts(project).await?.len();
            if existing >= cap {
                return Ok(());
            }
            tracing::info!(project, existing, cap, "creating service accounts");

            let mut batch = self.iam.batch();
            for _ in 0..cap - existing {
                IamClient::add_create_account(&mut batch, project, &generate_id(&self.config.account_prefix));
            }
            let items = self.iam.execute_batch(batch).await?;
            self.absorb_failures(items).await;
        }

        if self.list_service_accounts(project).await?.len() >= cap {
            Ok(())
        } else {
            Err(Error::AccountFillTimeout {
                project: project.to_string(),
                cap,
                rounds: self.config.max_fill_rounds,
            })
        }
    }

    /// Deletes every service account in the project with one batch.
    pub async fn delete_service_accounts(&self, project: &str) -> Result<(), Error> {
        let accounts = self.list_service_accounts(project).await?;
        if accounts.is_empty() {
            return Ok(());
        }
        tracing::info!(project, count = accounts.len(), "deleting service accounts");
        let mut batch = self.iam.batch();
        for account in &accounts {
            IamClient::add_delete_account(&mut batch, &account.name);
        }
        let items = self.iam.execute_batch(batch).await?;
        self.absorb_failures(items).await;
        Ok(())
    }

    pub(crate) fn iam(&self) -> &IamClient {
        &self.iam
    }

    /// Keeps successful items, drops the rest: rate-limited items cost a
    /// single fixed backoff pause, every other failure is logged and
    /// forgotten.
    pub(crate) async fn absorb_failures(&self, items: Vec<BatchItem>) -> Vec<BatchItem> {
        let mut successes = Vec::with_capacity(items.len());
        let mut throttled = false;
        for item in items {
            if item.is_success() {
                successes.push(item);
            } else if item.is_rate_limited() {
                throttled = true;
            } else if let Some(error) = item.error() {
                tracing::warn!(code = error.code, status = ?error.status, "batch item failed: {}", error.message);
            }
        }
        if throttled {
            tokio::time::sleep(self.config.rate_limit_backoff).await;
        }
        successes
    }
}
