//! `narrative accept` — Trust back the sender of an incoming attestation.

use clap::Args;

use crate::commands::trust::report_propagation;
use crate::config::NarrativeConfig;
use crate::node::NarrativeNode;

#[derive(Args, Debug)]
pub struct AcceptArgs {
    /// Id of the incoming attestation (see `narrative pending`).
    pub id: String,
}

pub async fn run(args: &AcceptArgs, config: NarrativeConfig) -> anyhow::Result<()> {
    let node = NarrativeNode::open(config).await?;
    let doc = node.local_document()?;

    let Some(incoming) = doc.trust_received.values().find(|a| a.id == args.id) else {
        anyhow::bail!("no incoming attestation with id {}", args.id);
    };
    let truster = incoming.truster_did.clone();

    let outcome = node.protocol().trust_back(&truster, node.notifications())?;
    println!("Trusted back {}", truster);
    println!("  Id:       {}", outcome.attestation.id);

    report_propagation(outcome).await
}
