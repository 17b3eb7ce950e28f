//! Narrative — command-line node for the peer-to-peer web of trust.
//!
//! Subcommands: init, identity, profile, trust, accept, decline, revoke,
//! pending, discover, export, import.

// Storage helpers are also used by tests.
#![allow(dead_code)]

mod commands;
mod config;
mod identity;
mod node;
mod replica;
mod seen;
mod storage;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::NarrativeConfig;

/// Narrative — signed trust attestations and profile discovery.
#[derive(Parser, Debug)]
#[command(name = "narrative", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, global = true, default_value = "narrative.toml")]
    config: PathBuf,

    /// Override the data directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a configuration file and create the local identity.
    Init(commands::init::InitArgs),
    /// Show the local DID and trust-exchange URI.
    Identity(commands::identity::IdentityArgs),
    /// Show or update the signed public profile.
    Profile(commands::profile::ProfileArgs),
    /// Attest trust in the owner of a trust-exchange URI.
    Trust(commands::trust::TrustArgs),
    /// Trust back the sender of an incoming attestation.
    Accept(commands::accept::AcceptArgs),
    /// Dismiss an incoming attestation.
    Decline(commands::decline::DeclineArgs),
    /// Withdraw trust given to a DID.
    Revoke(commands::revoke::RevokeArgs),
    /// List incoming attestations awaiting a decision.
    Pending(commands::pending::PendingArgs),
    /// Crawl the trust graph and list known profiles.
    Discover(commands::discover::DiscoverArgs),
    /// Write a document from the local replica to a file.
    Export(commands::export::ExportArgs),
    /// Merge a document exported from another replica.
    Import(commands::import::ImportArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = NarrativeConfig::load(&cli.config)?;
    if let Some(ref data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    init_tracing(&config);
    tracing::debug!(config = %cli.config.display(), "narrative v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Init(args) => commands::init::run(args, &cli.config, config).await,
        Commands::Identity(args) => commands::identity::run(args, config).await,
        Commands::Profile(args) => commands::profile::run(args, config).await,
        Commands::Trust(args) => commands::trust::run(args, config).await,
        Commands::Accept(args) => commands::accept::run(args, config).await,
        Commands::Decline(args) => commands::decline::run(args, config).await,
        Commands::Revoke(args) => commands::revoke::run(args, config).await,
        Commands::Pending(args) => commands::pending::run(args, config).await,
        Commands::Discover(args) => commands::discover::run(args, config).await,
        Commands::Export(args) => commands::export::run(args, config).await,
        Commands::Import(args) => commands::import::run(args, config).await,
    }
}

/// `RUST_LOG` wins over the configured level. Logs go to stderr so command
/// output stays parseable.
fn init_tracing(config: &NarrativeConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.json_logs() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
