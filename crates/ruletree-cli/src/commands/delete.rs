//! Delete command

use clap::Args;

use super::{Context, ScopeArgs};

#[derive(Debug, Args)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Rule to delete together with its subtree
    #[arg(long)]
    pub id: String,
}

pub fn execute(ctx: &Context, args: DeleteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = ctx.open_session(&args.scope)?;

    session.on_node_selected(Some(&args.id))?;
    let removed = session.on_delete_requested()?;

    println!("✓ Deleted {} rule(s)", removed.len());
    Ok(())
}
