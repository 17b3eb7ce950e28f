//! `narrative revoke` — Withdraw trust given to a DID.

use clap::Args;

use crate::config::NarrativeConfig;
use crate::node::NarrativeNode;

#[derive(Args, Debug)]
pub struct RevokeArgs {
    /// DID to stop trusting.
    pub did: String,
}

pub async fn run(args: &RevokeArgs, config: NarrativeConfig) -> anyhow::Result<()> {
    let node = NarrativeNode::open(config).await?;

    match node.protocol().revoke_trust(&args.did)? {
        Some(attestation) => {
            println!("Revoked trust in {}", args.did);
            println!("  Id:       {}", attestation.id);
            println!("  Their copy of the attestation is not changed.");
        }
        None => println!("{} was not trusted", args.did),
    }
    Ok(())
}
