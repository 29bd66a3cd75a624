//! Move command
//!
//! Usage: ruletree move --scope <SCOPE> --variant <VARIANT> --source <ID>
//!        --target <ID> --zone <top|middle|bottom>

use clap::Args;
use ruletree_core::{DropOutcome, VerticalZone};

use super::{Context, ScopeArgs};

#[derive(Debug, Args)]
pub struct MoveArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Rule being dragged
    #[arg(long)]
    pub source: String,

    /// Rule the drag ended on
    #[arg(long)]
    pub target: String,

    /// Where on the target row the drag ended
    #[arg(long)]
    pub zone: VerticalZone,
}

/// Execute move command
pub fn execute(ctx: &Context, args: MoveArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = ctx.open_session(&args.scope)?;

    match session.on_drop_gesture(&args.source, &args.target, args.zone)? {
        DropOutcome::Moved(plan) => {
            let parent = plan.parent_id.as_deref().unwrap_or("(root)");
            println!(
                "✓ Moved {} ({}, parent {})",
                plan.source_id, plan.kind, parent
            );
            Ok(())
        }
        DropOutcome::Rejected(reason) => Err(format!(
            "Drop of {} onto {} rejected: {}",
            args.source,
            args.target,
            reason.as_str()
        )
        .into()),
    }
}
