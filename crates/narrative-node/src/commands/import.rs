//! `narrative import` — Merge a document exported from another replica.

use clap::Args;
use std::path::PathBuf;

use narrative_core::{PersonalDocument, TrustFlags};

use crate::config::NarrativeConfig;
use crate::node::NarrativeNode;
use crate::replica::DocumentBundle;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// File written by `narrative export`.
    pub file: PathBuf,
}

pub async fn run(args: &ImportArgs, config: NarrativeConfig) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(&args.file)?;
    let bundle: DocumentBundle = serde_json::from_str(&contents)?;
    let node = NarrativeNode::open(config).await?;

    let owned = bundle.address == node.identity().address();
    if !owned {
        node.repo().import(&bundle.address, bundle.document, false)?;
        println!("Imported {}", bundle.address);
        return Ok(());
    }

    let incoming_did = bundle.document.get("did").and_then(|d| d.as_str());
    if incoming_did != Some(node.identity().did()) {
        anyhow::bail!(
            "{} is the local document address but the file belongs to {}",
            bundle.address,
            incoming_did.unwrap_or("nobody")
        );
    }

    let before = node.local_document()?;
    let merged = node.repo().import(&bundle.address, bundle.document, true)?;
    let after = PersonalDocument::from_value(merged)?;
    println!("Merged {} into the local document", bundle.address);

    let new_trusters: Vec<&String> = after
        .trust_received
        .keys()
        .filter(|did| !before.trust_received.contains_key(*did))
        .collect();
    for did in new_trusters {
        if TrustFlags::for_did(&after, did).is_mutual_trust {
            println!("  Mutual trust established with {}", did);
        } else {
            println!("  New attestation from {} (see: narrative pending)", did);
        }
    }
    Ok(())
}
