//! `narrative export` — Write a document from the local replica to a file.

use clap::Args;
use std::path::PathBuf;

use crate::config::NarrativeConfig;
use crate::node::NarrativeNode;
use crate::replica::DocumentBundle;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Document address (defaults to the local personal document).
    pub address: Option<String>,

    /// Output file (defaults to stdout).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: &ExportArgs, config: NarrativeConfig) -> anyhow::Result<()> {
    let node = NarrativeNode::open(config).await?;
    let address = args
        .address
        .clone()
        .unwrap_or_else(|| node.identity().address().to_string());

    let Some(document) = node.repo().export(&address)? else {
        anyhow::bail!("document {} is not held by this replica", address);
    };
    let bundle = DocumentBundle {
        address: address.clone(),
        document,
    };
    let json = serde_json::to_string_pretty(&bundle)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("Exported {} to {}", address, path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
