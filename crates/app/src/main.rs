//! ProHero provider client - command-line entry point
//!
//! Loads the configuration, wires the services over the file-backed
//! session stores and runs one subcommand.

mod cli;
mod commands;
mod context;

use clap::Parser;
use prohero_infrastructure::AppConfig;
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::commands::Prompt;
use crate::context::AppContext;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays clean.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = AppConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    if let Some(data_dir) = cli.data_dir.clone() {
        config = config.with_data_dir(data_dir);
    }

    tracing::debug!("Starting prohero v{}", env!("CARGO_PKG_VERSION"));

    let ctx = AppContext::build(&config)?;
    let mut prompt = Prompt::new(BufReader::new(tokio::io::stdin()));
    commands::run(cli.command, &ctx, &mut prompt).await
}
