//! `narrative profile` — Set the public profile and re-sign it.

use clap::Args;

use crate::config::NarrativeConfig;
use crate::node::NarrativeNode;

#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Display name (empty string clears it).
    #[arg(short, long)]
    pub name: Option<String>,

    /// Avatar URL (empty string clears it).
    #[arg(short, long)]
    pub avatar: Option<String>,
}

pub async fn run(args: &ProfileArgs, config: NarrativeConfig) -> anyhow::Result<()> {
    let node = NarrativeNode::open(config).await?;

    if args.name.is_none() && args.avatar.is_none() {
        let profile = node.local_document()?.profile;
        println!("Profile:");
        println!("  Name:     {}", profile.display_name.as_deref().unwrap_or("-"));
        println!("  Avatar:   {}", profile.avatar_url.as_deref().unwrap_or("-"));
        println!("  Updated:  {}", profile.updated_at);
        return Ok(());
    }

    let profile = node.update_profile(args.name.clone(), args.avatar.clone())?;
    println!("Profile signed and saved.");
    println!("  Name:     {}", profile.display_name.as_deref().unwrap_or("-"));
    println!("  Avatar:   {}", profile.avatar_url.as_deref().unwrap_or("-"));
    Ok(())
}
