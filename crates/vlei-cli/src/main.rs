//! vLEI CLI.
//!
//! Subcommands: init, setup, list-identities, list-credentials,
//! list-registries, clear, verify, chain, status.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// vLEI: chained credential issuance and trading-partner verification.
#[derive(Parser, Debug)]
#[command(name = "vlei", version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration and setup plan.
    Init(commands::init::InitArgs),
    /// Create the actor hierarchy and issue its credential chain.
    Setup(commands::setup::SetupArgs),
    /// List persisted identities.
    ListIdentities(commands::identities::IdentitiesArgs),
    /// List persisted credentials.
    ListCredentials(commands::credentials::CredentialsArgs),
    /// List persisted registries.
    ListRegistries(commands::registries::RegistriesArgs),
    /// Delete every persisted collection.
    Clear(commands::clear::ClearArgs),
    /// Verify a seller agent through a running node.
    Verify(commands::verify::VerifyArgs),
    /// Show the credential chain of an actor through a running node.
    Chain(commands::chain::ChainArgs),
    /// Query the status of a running node.
    Status(commands::status::StatusArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Setup(args) => commands::setup::run(args).await,
        Commands::ListIdentities(args) => commands::identities::run(args),
        Commands::ListCredentials(args) => commands::credentials::run(args),
        Commands::ListRegistries(args) => commands::registries::run(args),
        Commands::Clear(args) => commands::clear::run(args),
        Commands::Verify(args) => commands::verify::run(args).await,
        Commands::Chain(args) => commands::chain::run(args).await,
        Commands::Status(args) => commands::status::run(args).await,
    }
}
