//! `vlei status`: query the health of a running node.

use clap::Args;
use serde::Deserialize;

use super::unreachable_node;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// API endpoint of the node.
    #[arg(short, long, default_value = "http://127.0.0.1:9001")]
    pub endpoint: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealthData {
    identities_loaded: usize,
    credentials_loaded: usize,
    agents_available: usize,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_secs: u64,
    data: HealthData,
}

pub async fn run(args: &StatusArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/health", args.endpoint);
    match reqwest::get(&url).await {
        Ok(r) if r.status().is_success() => {
            let health: HealthResponse = r.json().await?;
            println!("Node Status:");
            println!("  Status:       {}", health.status);
            println!("  Version:      {}", health.version);
            println!("  Uptime:       {}s", health.uptime_secs);
            println!("  Identities:   {}", health.data.identities_loaded);
            println!("  Credentials:  {}", health.data.credentials_loaded);
            println!("  Agents:       {}", health.data.agents_available);
        }
        Ok(r) => {
            anyhow::bail!("node returned HTTP {}", r.status());
        }
        Err(e) => unreachable_node(&args.endpoint, &e),
    }
    Ok(())
}
