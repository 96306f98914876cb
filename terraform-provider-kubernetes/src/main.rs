use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use terraform_provider_kubernetes::{rpc, Provider};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Serve requests from stdin, one json object per line (the default)
    Serve,
    /// Print the provider schema as json
    Schema,
}

fn init_tracing() {
    // stdout carries responses, so logs go to stderr
    let filter = EnvFilter::try_from_env("TF_LOG_PROVIDER")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let provider = Arc::new(Provider::new());
    match cli.command.unwrap_or(Command::Serve) {
        Command::Schema => {
            let schema = serde_json::to_string_pretty(&provider.schema())?;
            println!("{schema}");
        }
        Command::Serve => {
            tracing::info!(version = env!("CARGO_PKG_VERSION"), "serving provider requests");
            let input = BufReader::new(tokio::io::stdin());
            rpc::serve(provider, input, tokio::io::stdout())
                .await
                .context("serving provider requests")?;
        }
    }
    Ok(())
}
