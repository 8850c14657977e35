//! codedeploy-clients
//!
//! Checks that the configured credentials, region and proxy can reach S3 and
//! CodeDeploy, or prints the AWS account ID of the current identity.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codedeploy_clients::aws::AccountResolver;
use codedeploy_clients::settings::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "codedeploy-clients", version, about)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a probe object and look up the CodeDeploy application
    Check,
    /// Print the account ID of the default-chain identity
    AccountId,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    tracing::debug!("Starting codedeploy-clients v{}", env!("CARGO_PKG_VERSION"));

    let settings = match &cli.settings {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    match cli.command {
        Command::Check => {
            let mode = settings.credential_mode()?;
            let bundle = settings
                .factory()?
                .build(&mode)
                .await
                .context("Failed to create AWS clients")?;

            bundle
                .probe(settings.bucket()?, settings.application()?)
                .await
                .context("Connectivity check failed")?;

            println!("OK");
        }
        Command::AccountId => {
            let account_id = AccountResolver::new(settings.proxy()?)
                .resolve_account_id()
                .await
                .context("Failed to resolve AWS account ID")?;

            println!("{}", account_id);
        }
    }

    Ok(())
}
