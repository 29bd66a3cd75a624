//! Duplicate command

use clap::Args;
use ruletree_core::DuplicateOutcome;

use super::{Context, ScopeArgs};

#[derive(Debug, Args)]
pub struct DuplicateArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Rule to copy
    #[arg(long)]
    pub id: String,
}

pub fn execute(ctx: &Context, args: DuplicateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = ctx.open_session(&args.scope)?;

    session.on_node_selected(Some(&args.id))?;
    match session.on_duplicate_requested()? {
        DuplicateOutcome::Duplicated { id } => {
            println!("✓ Duplicated {} as {}", args.id, id);
            Ok(())
        }
        DuplicateOutcome::Failed { reason } => {
            Err(format!("Could not duplicate {}: {}", args.id, reason).into())
        }
    }
}
