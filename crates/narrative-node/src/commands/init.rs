//! `narrative init` — Write a configuration file and create the identity.

use clap::Args;
use std::path::Path;

use crate::config::NarrativeConfig;
use crate::node::NarrativeNode;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Display name for the new identity.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,
}

pub async fn run(
    args: &InitArgs,
    config_path: &Path,
    mut config: NarrativeConfig,
) -> anyhow::Result<()> {
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "configuration file already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }

    if args.name.is_some() {
        config.identity.display_name = args.name.clone();
    }
    config.save(config_path)?;
    println!("Wrote configuration to {}", config_path.display());

    let node = NarrativeNode::open(config).await?;
    let identity = node.identity();
    println!("Identity ready:");
    println!("  DID:       {}", identity.did());
    println!("  Document:  {}", identity.address());
    println!("  Exchange:  {}", identity.exchange_uri()?);
    println!();
    println!("Share the exchange URI in person, e.g. as a QR code.");

    Ok(())
}
