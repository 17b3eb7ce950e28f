//! `narrative identity` — Show the local DID and trust-exchange URI.

use clap::Args;
use serde::Serialize;

use crate::config::NarrativeConfig;
use crate::node::NarrativeNode;

#[derive(Args, Debug)]
pub struct IdentityArgs {
    /// Print as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentityView<'a> {
    did: &'a str,
    user_doc: &'a str,
    exchange_uri: String,
    display_name: Option<String>,
}

pub async fn run(args: &IdentityArgs, config: NarrativeConfig) -> anyhow::Result<()> {
    let node = NarrativeNode::open(config).await?;
    let identity = node.identity();
    let doc = node.local_document()?;

    let view = IdentityView {
        did: identity.did(),
        user_doc: identity.address(),
        exchange_uri: identity.exchange_uri()?.to_string(),
        display_name: doc.profile.display_name,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("Identity:");
    println!("  DID:       {}", view.did);
    if let Some(name) = &view.display_name {
        println!("  Name:      {}", name);
    }
    println!("  Document:  {}", view.user_doc);
    println!("  Exchange:  {}", view.exchange_uri);
    Ok(())
}
