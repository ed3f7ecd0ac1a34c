//! Shared plumbing for the factory binaries: flag surface, interactive
//! authorization and the first-listing bootstrap.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sa_factory::{ServiceAccountFactory, TargetSelector};
use sa_factory_auth::cache::TokenCache;
use sa_factory_auth::credentials::ClientSecrets;
use sa_factory_auth::flow::InstalledFlow;
use sa_factory_auth::token_source::TokenSource;
use sa_factory_auth::{create_token_source, SCOPES};

#[derive(Parser, Debug)]
#[command(author, version, about = "A tool to bulk-provision Google Cloud service accounts.")]
pub struct FactoryArgs {
    /// Directory the exported key files are written to.
    #[arg(short, long, default_value = "accounts")]
    pub path: PathBuf,

    /// Path of the cached token file.
    #[arg(long, default_value = "token_sa.json")]
    pub token: PathBuf,

    /// Path of the OAuth client secrets file.
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// List the projects visible to the user.
    #[arg(long)]
    pub list_projects: bool,

    /// List the service accounts in a project.
    #[arg(long, value_name = "PROJECT")]
    pub list_sas: Option<String>,

    /// Create up to N projects.
    #[arg(long, value_name = "N")]
    pub create_projects: Option<usize>,

    /// Maximum number of projects allowed.
    #[arg(long, default_value_t = 12)]
    pub max_projects: usize,

    /// Enable services on the target projects (`~`, `*` or a project id).
    #[arg(long, value_name = "TARGET")]
    pub enable_services: Option<TargetSelector>,

    /// Services to enable. Replaces the default set.
    #[arg(long, num_args = 1.., default_values_t = default_services())]
    pub services: Vec<String>,

    /// Create service accounts in the target projects.
    #[arg(long, value_name = "TARGET")]
    pub create_sas: Option<TargetSelector>,

    /// Delete the service accounts in the target projects.
    #[arg(long, value_name = "TARGET")]
    pub delete_sas: Option<TargetSelector>,

    /// Download keys for every service account in the target projects.
    #[arg(long, value_name = "TARGET")]
    pub download_keys: Option<TargetSelector>,

    /// Create projects, enable services, create accounts and download
    /// keys in one go.
    #[arg(long, value_name = "N")]
    pub quick_setup: Option<usize>,

    /// Restrict quick setup to freshly created projects only.
    #[arg(long)]
    pub new_only: bool,
}

fn default_services() -> Vec<String> {
    vec!["iam".to_string(), "drive".to_string()]
}

impl FactoryArgs {
    /// Expands `--quick-setup N` into the create → enable → create-sas →
    /// download-keys chain, targeting only new projects when `--new-only`
    /// is set.
    pub fn apply_quick_setup(&mut self) {
        // A zero count is treated as if the flag were absent.
        let count = match self.quick_setup {
            Some(count) if count > 0 => count,
            _ => return,
        };
        let target = if self.new_only {
            TargetSelector::NewlyCreated
        } else {
            TargetSelector::All
        };
        self.services = default_services();
        self.create_projects = Some(count);
        self.enable_services = Some(target.clone());
        self.create_sas = Some(target.clone());
        self.download_keys = Some(target);
    }

    /// Bare service names qualified with the provider suffix.
    pub fn qualified_services(&self) -> Vec<String> {
        self.services
            .iter()
            .map(|s| format!("{s}.googleapis.com"))
            .collect()
    }
}

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Returns `path` if it exists, otherwise offers the JSON files in the
/// working directory as an interactive selection.
pub fn pick_credentials(path: &Path) -> anyhow::Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    let mut options: Vec<PathBuf> = std::fs::read_dir(".")?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    options.sort();
    anyhow::ensure!(
        !options.is_empty(),
        "no credentials found at {}; enable the Drive API and save the OAuth client secrets as credentials.json",
        path.display()
    );

    println!("No credentials found at {}.", path.display());
    let names: Vec<String> = options.iter().map(|p| p.display().to_string()).collect();
    let selection = dialoguer::Select::new()
        .with_prompt("Select a credentials file")
        .items(&names)
        .default(0)
        .interact()?;
    println!(
        "Pass --credentials {} next time to skip this prompt.",
        options[selection].display()
    );
    Ok(options[selection].clone())
}

/// Produces a token source from the cache, falling back to the
/// interactive console flow when no refresh token is stored yet.
pub async fn authorize(
    credentials: &Path,
    token: &Path,
) -> anyhow::Result<(Arc<dyn TokenSource>, ClientSecrets)> {
    let secrets = ClientSecrets::new_from_file(credentials)
        .await
        .with_context(|| format!("reading client secrets from {}", credentials.display()))?;
    let cache = TokenCache::new(token);

    let ts = match create_token_source(&secrets, &cache).await {
        Ok(ts) => ts,
        Err(sa_factory_auth::error::Error::AuthorizationRequired) => {
            let scopes: Vec<&str> = SCOPES.to_vec();
            let flow = InstalledFlow::new(&secrets, &scopes);
            println!("Open this link in your browser and grant access:\n\n  {}\n", flow.authorize_url());
            let code: String = dialoguer::Input::new()
                .with_prompt("Enter the authorization code")
                .interact_text()?;
            let stored = flow.exchange_code(&code).await?;
            cache.store(&stored).await?;
            create_token_source(&secrets, &cache)
                .await
                .context("the authorization server did not return a refresh token")?
        }
        Err(e) => return Err(e.into()),
    };
    Ok((Arc::from(ts), secrets))
}

/// First listing after authorization. A `PERMISSION_DENIED` here means
/// the Resource Manager API is still disabled for the OAuth client's own
/// project; enable it and let the user retry once propagation catches up.
pub async fn ensure_project_access(
    factory: &ServiceAccountFactory,
    secrets: &ClientSecrets,
) -> anyhow::Result<Vec<String>> {
    loop {
        match factory.list_projects().await {
            Ok(projects) => return Ok(projects),
            Err(e) if e.is_permission_denied() => {
                let project = secrets
                    .project_id()
                    .context("client secrets file has no project_id")?;
                eprintln!("The Cloud Resource Manager API is not enabled for {project}; requesting enablement.");
                if let Err(enable_error) = factory
                    .service_usage()
                    .enable_service(project, "cloudresourcemanager.googleapis.com")
                    .await
                {
                    eprintln!("{enable_error}");
                }
                let retry = dialoguer::Confirm::new()
                    .with_prompt("Retry listing projects?")
                    .default(true)
                    .interact()?;
                anyhow::ensure!(retry, "aborted");
            }
            Err(e) => return Err(e.into()),
        }
    }
}
