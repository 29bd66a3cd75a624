//! Create command
//!
//! Usage: ruletree create --scope <SCOPE> --variant <VARIANT> [--parent <ID>]

use clap::Args;

use super::{Context, ScopeArgs};

#[derive(Debug, Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Parent rule; the new rule becomes a root when omitted
    #[arg(long)]
    pub parent: Option<String>,
}

/// Execute create command
pub fn execute(ctx: &Context, args: CreateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = ctx.open_session(&args.scope)?;

    session.on_node_selected(args.parent.as_deref())?;
    let id = session.on_create_requested()?;

    println!("✓ Created rule {}", id);
    Ok(())
}
