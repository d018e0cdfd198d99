//! vLEI node entry point.
//!
//! Serves the verification API over the persisted credential store.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use vlei_node::api::start_api_server;
use vlei_node::config::LogFormat;
use vlei_node::{NodeConfig, NodeState, Storage};

/// vLEI verification node
#[derive(Parser, Debug)]
#[command(name = "vlei-node", version, about = "vLEI verification node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "vlei.toml")]
    config: PathBuf,

    /// Override the API port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.init {
        init_tracing("info", LogFormat::Text);
        let config = NodeConfig::default();
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    let mut config = NodeConfig::load(&args.config)?;
    if let Some(api_port) = args.api_port {
        config.api.port = api_port;
    }
    if let Some(ref data_dir) = args.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging.level, config.logging.format);
    tracing::info!("vLEI node v{}", env!("CARGO_PKG_VERSION"));

    let storage = Arc::new(Storage::open(&config.storage.data_dir)?);
    let state = Arc::new(NodeState::new(storage, config.setup.flow.flow()));
    let addr: SocketAddr = config.api_addr()?;

    tracing::info!(
        data_dir = %config.storage.data_dir.display(),
        flow = %config.setup.flow,
        "serving credential store"
    );

    tokio::select! {
        result = start_api_server(addr, state) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "API server error");
                return Err(e);
            }
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("received shutdown signal");
        }
    }

    tracing::info!("vLEI node exited cleanly");
    Ok(())
}
