//! `narrative pending` — List incoming attestations awaiting a decision.

use clap::Args;

use crate::commands::describe;
use crate::config::NarrativeConfig;
use crate::node::NarrativeNode;

#[derive(Args, Debug)]
pub struct PendingArgs {
    /// Print as JSON.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: &PendingArgs, config: NarrativeConfig) -> anyhow::Result<()> {
    let node = NarrativeNode::open(config).await?;
    let doc = node.local_document()?;
    let pending = node.notifications().pending_attestations(&doc)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(());
    }

    if pending.is_empty() {
        println!("No pending attestations.");
        return Ok(());
    }
    println!("Pending attestations ({}):", pending.len());
    for attestation in &pending {
        println!("  {}", describe(attestation));
    }
    println!();
    println!("Respond with: narrative accept <id> | narrative decline <id>");
    Ok(())
}
