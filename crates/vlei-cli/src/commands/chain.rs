//! `vlei chain`: show the credential chain of an actor through a running node.

use clap::Args;
use serde::Deserialize;

use super::{api_error, unreachable_node};

#[derive(Args, Debug)]
pub struct ChainArgs {
    /// Alias of the chain leaf (agent or person).
    pub alias: String,

    /// API endpoint of the node.
    #[arg(short, long, default_value = "http://127.0.0.1:9001")]
    pub endpoint: String,
}

#[derive(Deserialize)]
struct LinkResult {
    position: usize,
    #[serde(rename = "type")]
    credential_type: String,
    said: String,
    valid: bool,
    reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainVerification {
    valid: bool,
    complete: bool,
    expected_length: usize,
    links: Vec<LinkResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EdgeResult {
    from: String,
    to: String,
    edge_name: String,
    valid: bool,
    reason: Option<String>,
}

#[derive(Deserialize)]
struct EdgeVerification {
    valid: bool,
    edges: Vec<EdgeResult>,
}

#[derive(Deserialize)]
struct ChainResponse {
    chain: ChainVerification,
    edges: EdgeVerification,
    warnings: Vec<String>,
}

pub async fn run(args: &ChainArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/v1/chain/{}", args.endpoint, args.alias);
    let resp = match reqwest::get(&url).await {
        Ok(r) => r,
        Err(e) => {
            unreachable_node(&args.endpoint, &e);
            return Ok(());
        }
    };
    if !resp.status().is_success() {
        return Err(api_error("chain lookup", resp).await);
    }

    let data: ChainResponse = resp.json().await?;
    println!(
        "Chain for {}: {} ({} of {} credentials{})",
        args.alias,
        if data.chain.valid { "VALID" } else { "INVALID" },
        data.chain.links.len(),
        data.chain.expected_length,
        if data.chain.complete { "" } else { ", incomplete" }
    );
    for link in &data.chain.links {
        let icon = if link.valid { "PASS" } else { "FAIL" };
        print!("  [{}] {}. {} {}", icon, link.position, link.credential_type, link.said);
        if let Some(ref reason) = link.reason {
            print!(": {}", reason);
        }
        println!();
    }

    println!();
    println!("Edges: {}", if data.edges.valid { "VALID" } else { "INVALID" });
    for edge in &data.edges.edges {
        let icon = if edge.valid { "PASS" } else { "FAIL" };
        print!("  [{}] {} -[{}]-> {}", icon, edge.from, edge.edge_name, edge.to);
        if let Some(ref reason) = edge.reason {
            print!(": {}", reason);
        }
        println!();
    }
    for warning in &data.warnings {
        println!("  ~ {}", warning);
    }
    Ok(())
}
