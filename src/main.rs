mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pooch_palace::config;
use pooch_palace::dogs::types::ApiVersion;
use pooch_palace::server;

#[derive(Parser)]
#[command(name = "pooch", version, about = "Pooch Palace adoption service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (REST routes plus the scheduler at /mcp)
    Serve,
    /// Run the pickup scheduler as an MCP server on stdio
    Scheduler,
    /// Inspect or update dogs in the local database
    Dogs {
        #[command(subcommand)]
        action: DogsAction,
    },
    /// Check database health
    Doctor,
}

#[derive(Subcommand)]
enum DogsAction {
    /// Print every dog as JSON
    List {
        /// Listing shape: 1.0 (id and fullName) or 1.1 (full records)
        #[arg(long, default_value = "1.1")]
        api_version: ApiVersion,
    },
    /// Give a dog to a new owner
    Adopt { dog_id: i64, owner: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::PoochConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC and CLI output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            server::serve(config).await?;
        }
        Command::Scheduler => {
            server::serve_stdio(config).await?;
        }
        Command::Dogs { action } => match action {
            DogsAction::List { api_version } => cli::dogs::list(&config, api_version)?,
            DogsAction::Adopt { dog_id, owner } => cli::dogs::adopt(&config, dog_id, &owner)?,
        },
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
