//! RuleTree CLI
//!
//! Command-line host for rule hierarchy sessions. Every invocation opens one
//! session over the SQLite store, performs one operation and exits.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ruletree_core::logging_facility;
use ruletree_core::RuleTreeConfig;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "ruletree")]
#[command(about = "RuleTree - Edit rule hierarchies", long_about = None)]
struct Cli {
    /// Rule database (overrides `store.database` from the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load a hierarchy and print it
    Tree(commands::tree::TreeArgs),
    /// Create an empty rule
    Create(commands::create::CreateArgs),
    /// Drop one rule onto another
    Move(commands::r#move::MoveArgs),
    /// Delete a rule and its subtree
    Delete(commands::delete::DeleteArgs),
    /// Copy a rule and its subtree next to the original
    Duplicate(commands::duplicate::DuplicateArgs),
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = RuleTreeConfig::load_or_default(cli.config.as_deref())?;
    logging_facility::init(config.logging.profile);
    let ctx = commands::Context::new(config, cli.db);

    match cli.command {
        Commands::Tree(args) => commands::tree::execute(&ctx, args),
        Commands::Create(args) => commands::create::execute(&ctx, args),
        Commands::Move(args) => commands::r#move::execute(&ctx, args),
        Commands::Delete(args) => commands::delete::execute(&ctx, args),
        Commands::Duplicate(args) => commands::duplicate::execute(&ctx, args),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
