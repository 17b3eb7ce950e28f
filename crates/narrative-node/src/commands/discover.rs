//! `narrative discover` — Crawl the trust graph and list known profiles.

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

use narrative_core::{Did, TrustExchangeUri};
use narrative_discovery::{DiscoveryError, DiscoverySnapshot, TrackState};

use crate::config::NarrativeConfig;
use crate::node::NarrativeNode;

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Seconds to wait for the crawl to settle.
    #[arg(long, default_value_t = 30)]
    pub wait: u64,

    /// Also resolve this trust-exchange URI (repeatable).
    #[arg(long = "external")]
    pub externals: Vec<String>,

    /// Collaborative document (JSON with an `identities` table) to use as a
    /// fallback name source (repeatable).
    #[arg(long = "workspace")]
    pub workspaces: Vec<PathBuf>,

    /// Print the full snapshot as JSON.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: &DiscoverArgs, config: NarrativeConfig) -> anyhow::Result<()> {
    let node = NarrativeNode::open(config).await?;
    let engine = node.discovery();

    for uri in &args.externals {
        let exchange = TrustExchangeUri::parse(uri)?;
        let Some(address) = exchange.user_doc.as_deref() else {
            anyhow::bail!("{} carries no userDoc address", uri);
        };
        engine.register_external(exchange.did.uri(), address)?;
    }
    for path in &args.workspaces {
        let contents = std::fs::read_to_string(path)?;
        let document: serde_json::Value = serde_json::from_str(&contents)?;
        engine.update_workspace(&path.display().to_string(), &document)?;
    }

    let wait = Duration::from_secs(args.wait);
    let snapshot = match engine
        .wait_until(wait, |s| !s.tracked.is_empty() && s.is_settled())
        .await
    {
        Ok(snapshot) => snapshot,
        Err(DiscoveryError::Timeout) => {
            tracing::warn!(wait_secs = args.wait, "discovery did not settle");
            engine.snapshot()
        }
        Err(e) => return Err(e.into()),
    };
    engine.shutdown().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }
    print_snapshot(&snapshot);
    Ok(())
}

fn print_snapshot(snapshot: &DiscoverySnapshot) {
    println!("Known profiles ({}):", snapshot.profiles.len());
    for entry in &snapshot.profiles {
        let profile = &entry.profile;
        let did = Did::new(profile.did.as_str())
            .map(|d| d.short())
            .unwrap_or_else(|_| profile.did.clone());
        let flags = &entry.flags;
        let trust = if flags.is_mutual_trust {
            "mutual"
        } else if flags.is_trust_given {
            "given"
        } else if flags.is_trust_received {
            "received"
        } else {
            "-"
        };
        println!(
            "  {:<24} {:<20} {:<15} sig:{:<8} trust:{}",
            did,
            profile.display_name.as_deref().unwrap_or("(unnamed)"),
            profile.discovery_source,
            profile.signature_status,
            trust,
        );
    }

    let problems: Vec<_> = snapshot
        .tracked
        .iter()
        .filter(|t| !matches!(t.state, TrackState::Live))
        .collect();
    if problems.is_empty() {
        return;
    }
    println!();
    println!("Unresolved documents ({}):", problems.len());
    for tracked in problems {
        let state = match &tracked.state {
            TrackState::Resolving => "still resolving".to_string(),
            TrackState::Unreachable { reason } => format!("unreachable: {}", reason),
            TrackState::Mismatch { expected, found } => {
                format!("belongs to {} (expected {})", found, expected)
            }
            TrackState::Live => "live".to_string(),
        };
        println!("  {}  {}", tracked.address, state);
    }
}
