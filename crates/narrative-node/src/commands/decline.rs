//! `narrative decline` — Dismiss an incoming attestation.

use clap::Args;

use crate::config::NarrativeConfig;
use crate::node::NarrativeNode;

#[derive(Args, Debug)]
pub struct DeclineArgs {
    /// Id of the incoming attestation.
    pub id: String,
}

pub async fn run(args: &DeclineArgs, config: NarrativeConfig) -> anyhow::Result<()> {
    let node = NarrativeNode::open(config).await?;
    let doc = node.local_document()?;
    if !doc.trust_received.values().any(|a| a.id == args.id) {
        anyhow::bail!("no incoming attestation with id {}", args.id);
    }

    node.notifications().decline(&args.id)?;
    println!("Declined {}", args.id);
    Ok(())
}
