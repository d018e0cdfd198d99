//! `vlei list-registries`: list persisted credential registries.

use clap::Args;

use super::StoreArgs;

#[derive(Args, Debug)]
pub struct RegistriesArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

pub fn run(args: &RegistriesArgs) -> anyhow::Result<()> {
    let registries = args.store.open_storage()?.registries()?;
    if registries.is_empty() {
        println!("No registries stored.");
        return Ok(());
    }

    println!("Registries ({}):", registries.len());
    for registry in &registries {
        println!(
            "  {:<24} owner {:<20} {}",
            registry.name, registry.owner_alias, registry.identifier
        );
    }
    Ok(())
}
