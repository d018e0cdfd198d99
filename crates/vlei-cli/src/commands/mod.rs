pub mod chain;
pub mod clear;
pub mod credentials;
pub mod identities;
pub mod init;
pub mod registries;
pub mod setup;
pub mod status;
pub mod verify;

use clap::Args;
use serde::Deserialize;
use std::path::PathBuf;

use vlei_node::{NodeConfig, Storage};

/// Options shared by commands that touch the local store.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "vlei.toml")]
    pub config: PathBuf,

    /// Override the data directory.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

impl StoreArgs {
    pub fn load_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = NodeConfig::load(&self.config)?;
        if let Some(ref data_dir) = self.data_dir {
            config.storage.data_dir = data_dir.clone();
        }
        Ok(config)
    }

    pub fn open_storage(&self) -> anyhow::Result<Storage> {
        let config = self.load_config()?;
        Storage::open(&config.storage.data_dir)
    }
}

#[derive(Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Turn a non-success response into an error carrying the node's message.
pub async fn api_error(action: &str, resp: reqwest::Response) -> anyhow::Error {
    let status = resp.status();
    match resp.json::<ErrorResponse>().await {
        Ok(err) => anyhow::anyhow!("{} failed (HTTP {}): {}", action, status, err.error),
        Err(_) => anyhow::anyhow!("{} failed (HTTP {})", action, status),
    }
}

pub fn unreachable_node(endpoint: &str, error: &reqwest::Error) {
    println!("Could not reach node at {}", endpoint);
    println!("  Error: {}", error);
    println!();
    println!("Is the node running? Start it with: vlei-node");
}
