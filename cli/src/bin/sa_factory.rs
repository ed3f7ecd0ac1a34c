use clap::Parser;
use sa_factory::{FactoryConfig, ServiceAccountFactory};
use sa_factory_cli::{authorize, ensure_project_access, init_tracing, pick_credentials, FactoryArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let mut args = FactoryArgs::parse();
    args.apply_quick_setup();
    args.credentials = pick_credentials(&args.credentials)?;

    let (ts, secrets) = authorize(&args.credentials, &args.token).await?;
    let config = FactoryConfig {
        max_projects: args.max_projects,
        ..FactoryConfig::default()
    };
    let factory = ServiceAccountFactory::new(ts, config);

    ensure_project_access(&factory, &secrets).await?;

    if args.list_projects {
        let projects = factory.list_projects().await?;
        if projects.is_empty() {
            println!("No projects.");
        } else {
            println!("Projects ({}):", projects.len());
            for project in &projects {
                println!("  {project}");
            }
        }
        return Ok(());
    }

    if let Some(project) = &args.list_sas {
        let accounts = factory.list_service_accounts(project).await?;
        if accounts.is_empty() {
            println!("No service accounts in {project}.");
        } else {
            println!("Service accounts in {project} ({}):", accounts.len());
            for account in &accounts {
                println!("  {} ({})", account.email, account.unique_id);
            }
        }
        return Ok(());
    }

    let mut created: Vec<String> = Vec::new();
    if let Some(count) = args.create_projects {
        if count > 0 {
            created = factory.create_projects(count).await?;
        } else {
            println!("This run will overwrite the service accounts of existing projects.");
            let proceed = dialoguer::Confirm::new()
                .with_prompt("Continue?")
                .default(false)
                .interact()?;
            anyhow::ensure!(proceed, "aborted");
        }
    }

    if let Some(selector) = &args.enable_services {
        let targets = factory.resolve_targets(selector, &created).await?;
        factory
            .enable_services(&targets, &args.qualified_services())
            .await?;
    }

    if let Some(selector) = &args.create_sas {
        for project in factory.resolve_targets(selector, &created).await? {
            factory.create_remaining_accounts(&project).await?;
        }
    }

    if let Some(selector) = &args.download_keys {
        let targets = factory.resolve_targets(selector, &created).await?;
        let written = factory.download_keys(&targets, &args.path).await?;
        println!("Wrote {written} key files to {}.", args.path.display());
    }

    if let Some(selector) = &args.delete_sas {
        for project in factory.resolve_targets(selector, &created).await? {
            factory.delete_service_accounts(&project).await?;
        }
    }

    Ok(())
}
