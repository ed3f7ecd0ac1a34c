use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sa_factory::http::drive::{DriveClient, MAX_BATCH_SIZE};
use sa_factory::keys::{read_key_emails, share_drive};
use sa_factory_cli::{authorize, init_tracing};

/// Adds every exported service account to a shared drive as an organizer.
#[derive(Parser, Debug)]
#[command(author, version)]
struct Args {
    /// Directory holding the exported key files.
    #[arg(short, long, default_value = "accounts")]
    path: PathBuf,

    /// Path of the OAuth client secrets file.
    #[arg(short, long, default_value = "credentials.json")]
    credentials: PathBuf,

    /// Path of the cached token file.
    #[arg(long, default_value = "token_sa.json")]
    token: PathBuf,

    /// Skip the sanity prompt.
    #[arg(short, long)]
    yes: bool,

    /// The id of the shared drive.
    #[arg(short, long)]
    drive_id: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let started = Instant::now();

    anyhow::ensure!(
        args.credentials.exists(),
        "no credentials found at {}",
        args.credentials.display()
    );

    if !args.yes {
        let proceed = dialoguer::Confirm::new()
            .with_prompt(
                "Make sure the Google account that generated the credentials \
                 is a manager of the shared drive. Continue?",
            )
            .default(true)
            .interact()?;
        anyhow::ensure!(proceed, "aborted");
    }

    let (ts, _secrets) = authorize(&args.credentials, &args.token).await?;
    let drive = DriveClient::new(ts, reqwest::Client::new());

    let emails = read_key_emails(&args.path).await?;
    anyhow::ensure!(!emails.is_empty(), "no key files found in {}", args.path.display());

    let bar = ProgressBar::new(emails.len() as u64);
    bar.set_style(ProgressStyle::with_template(
        "Adding accounts [{bar:40}] {pos}/{len}",
    )?);
    let mut granted = 0usize;
    for chunk in emails.chunks(MAX_BATCH_SIZE) {
        granted += share_drive(&drive, &args.drive_id, chunk).await?;
        bar.inc(chunk.len() as u64);
    }
    bar.finish();

    println!("Added {granted} of {} accounts.", emails.len());
    let elapsed = started.elapsed();
    let hours = elapsed.as_secs() / 3600;
    let minutes = (elapsed.as_secs() % 3600) / 60;
    let seconds = elapsed.as_secs_f64() % 60.0;
    println!("Elapsed:\n{hours:02}:{minutes:02}:{seconds:05.2}");
    Ok(())
}
