//! `vlei setup`: create the actor hierarchy and issue its credential chain.

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use vlei_credentials::FlowVariant;
use vlei_identity::LocalNetwork;
use vlei_node::{SetupOrchestrator, SetupPlan, Storage};

use super::StoreArgs;

#[derive(Args, Debug)]
pub struct SetupArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Setup plan (TOML). Defaults to the configured plan, or the built-in
    /// sample when that file is missing.
    #[arg(short, long)]
    pub plan: Option<PathBuf>,

    /// Issuance flow: official or direct.
    #[arg(long)]
    pub flow: Option<FlowVariant>,

    /// Clear the store before running.
    #[arg(long)]
    pub fresh: bool,
}

pub async fn run(args: &SetupArgs) -> anyhow::Result<()> {
    let config = args.store.load_config()?;
    let flow = args.flow.unwrap_or(config.setup.flow);

    let plan = match &args.plan {
        Some(path) => SetupPlan::load(path)?,
        None if config.setup.plan_path.exists() => SetupPlan::load(&config.setup.plan_path)?,
        None => {
            tracing::info!("no setup plan found, using the built-in sample");
            SetupPlan::sample()
        }
    };

    let storage = Arc::new(Storage::open(&config.storage.data_dir)?);
    if args.fresh {
        storage.clear_all()?;
    }

    let network = Arc::new(LocalNetwork::new());
    let orchestrator = SetupOrchestrator::new(network, storage, config.protocol.clone(), flow);
    let summary = orchestrator.run(&plan).await?;

    println!("Setup complete ({} flow)", summary.flow);
    println!();
    println!("Actors:");
    for actor in &summary.actors {
        println!("  {:<24} {:<20} {}", actor.alias, actor.role.to_string(), actor.prefix);
    }
    println!();
    println!("Credentials:");
    for credential in &summary.credentials {
        println!(
            "  {:<9} {} -> {}  {}",
            credential.kind, credential.issuer, credential.holder, credential.said
        );
    }
    println!();
    println!("Data written to {}", config.storage.data_dir.display());
    Ok(())
}
