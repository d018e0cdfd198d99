//! `vlei list-credentials`: list persisted credentials.

use clap::Args;

use super::StoreArgs;

#[derive(Args, Debug)]
pub struct CredentialsArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Print raw JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &CredentialsArgs) -> anyhow::Result<()> {
    let credentials = args.store.open_storage()?.credentials()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&credentials)?);
        return Ok(());
    }
    if credentials.is_empty() {
        println!("No credentials stored. Run `vlei setup` first.");
        return Ok(());
    }

    println!("Credentials ({}):", credentials.len());
    for credential in &credentials {
        println!(
            "  {:<28} {:<8} {}",
            credential.credential_type, credential.status.to_string(), credential.said
        );
        println!("      issuer: {}  issuee: {}", credential.issuer, credential.issuee);
        if let Some(ref edges) = credential.edges {
            for (name, edge) in edges {
                println!("      edge {}: {}", name, edge.target_said);
            }
        }
    }
    Ok(())
}
