use std::path::PathBuf;

use clap::Parser;
use sa_factory::keys::read_key_emails;

/// Prints the e-mail address of every exported service account, ten per
/// block, ready for pasting into a sharing dialog.
#[derive(Parser, Debug)]
#[command(author, version)]
struct Args {
    /// Directory holding the exported key files.
    #[arg(short, long, default_value = "accounts")]
    path: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let emails = read_key_emails(&args.path).await?;
    anyhow::ensure!(!emails.is_empty(), "no key files found in {}", args.path.display());

    for (index, chunk) in emails.chunks(10).enumerate() {
        if index > 0 {
            println!();
            println!("-------------------------------------");
            println!();
        }
        println!("{}", chunk.join(", "));
    }
    Ok(())
}
