//! `vlei clear`: delete every persisted collection.

use clap::Args;

use super::StoreArgs;

#[derive(Args, Debug)]
pub struct ClearArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Skip the confirmation guard.
    #[arg(short, long)]
    pub yes: bool,
}

pub fn run(args: &ClearArgs) -> anyhow::Result<()> {
    let storage = args.store.open_storage()?;
    if !args.yes {
        println!(
            "This deletes all identities, credentials, registries and connections in {}.",
            storage.data_dir().display()
        );
        println!("Re-run with --yes to confirm.");
        return Ok(());
    }
    storage.clear_all()?;
    println!("Cleared {}", storage.data_dir().display());
    Ok(())
}
