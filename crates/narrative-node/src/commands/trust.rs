//! `narrative trust` — Attest trust in someone met in person.

use clap::Args;

use narrative_core::TrustExchangeUri;
use narrative_trust::{PropagationOutcome, TrustOutcome};

use crate::config::NarrativeConfig;
use crate::node::NarrativeNode;

#[derive(Args, Debug)]
pub struct TrustArgs {
    /// Trust-exchange URI (narrative://verify/<did>?userDoc=...).
    pub uri: String,
}

pub async fn run(args: &TrustArgs, config: NarrativeConfig) -> anyhow::Result<()> {
    let exchange = TrustExchangeUri::parse(&args.uri)?;
    let node = NarrativeNode::open(config).await?;

    let outcome = node
        .protocol()
        .trust_user(exchange.did.uri(), exchange.user_doc.as_deref())?;
    println!("Trust attested!");
    println!("  Trustee:  {}", exchange.did);
    println!("  Id:       {}", outcome.attestation.id);

    report_propagation(outcome).await
}

/// Wait for the remote append and describe how it went.
pub(crate) async fn report_propagation(outcome: TrustOutcome) -> anyhow::Result<()> {
    let Some(propagation) = outcome.propagation else {
        println!("  Delivery: skipped (no document address for the trustee)");
        return Ok(());
    };

    match propagation.await? {
        PropagationOutcome::Delivered { address } => {
            println!("  Delivery: written to {}", address);
            println!();
            println!("Export that document to hand it back: narrative export {}", address);
        }
        PropagationOutcome::Unreachable { address, reason } => {
            println!("  Delivery: {} unreachable ({})", address, reason);
            println!("  The attestation is kept locally; import their document and trust again to deliver.");
        }
        PropagationOutcome::DidMismatch {
            address,
            expected,
            found,
        } => {
            println!("  Delivery: refused, {} belongs to {} not {}", address, found, expected);
        }
    }
    Ok(())
}
