//! `vlei list-identities`: list persisted identities.

use clap::Args;

use super::StoreArgs;

#[derive(Args, Debug)]
pub struct IdentitiesArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Print raw JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &IdentitiesArgs) -> anyhow::Result<()> {
    let identities = args.store.open_storage()?.identities()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&identities)?);
        return Ok(());
    }
    if identities.is_empty() {
        println!("No identities stored. Run `vlei setup` first.");
        return Ok(());
    }

    println!("Identities ({}):", identities.len());
    for identity in &identities {
        print!("  {:<24} {:<20} {}", identity.alias, identity.role.to_string(), identity.prefix);
        if let Some(ref title) = identity.title {
            print!("  [{}]", title);
        }
        println!();
    }
    Ok(())
}
