//! Tree command
//!
//! Usage: ruletree tree --scope <SCOPE> --variant <VARIANT>

use clap::Args;

use super::{Context, ScopeArgs};

#[derive(Debug, Args)]
pub struct TreeArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Print rule ids next to the labels
    #[arg(long)]
    pub ids: bool,
}

/// Execute tree command
pub fn execute(ctx: &Context, args: TreeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let session = ctx.open_session(&args.scope)?;
    let tree = session.tree();

    if tree.is_empty() {
        println!("(no rules)");
        return Ok(());
    }

    for (depth, node) in tree.walk() {
        let indent = "  ".repeat(depth);
        if args.ids {
            println!("{}[{}] {} ({})", indent, node.icon, node.label, node.id);
        } else {
            println!("{}[{}] {}", indent, node.icon, node.label);
        }
    }

    Ok(())
}
