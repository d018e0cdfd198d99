//! `vlei init`: write a default configuration and a sample setup plan.

use clap::Args;
use std::path::PathBuf;

use vlei_node::{NodeConfig, SetupPlan};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the configuration file.
    #[arg(short, long, default_value = "vlei.toml")]
    pub config: PathBuf,

    /// Overwrite existing files.
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &InitArgs) -> anyhow::Result<()> {
    if args.config.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            args.config.display()
        );
    }

    let config = NodeConfig::default();
    config.save(&args.config)?;
    println!("Wrote configuration to {}", args.config.display());

    let plan_path = &config.setup.plan_path;
    if plan_path.exists() && !args.force {
        println!("Kept existing setup plan at {}", plan_path.display());
    } else {
        SetupPlan::sample().save(plan_path)?;
        println!("Wrote sample setup plan to {}", plan_path.display());
    }
    Ok(())
}
