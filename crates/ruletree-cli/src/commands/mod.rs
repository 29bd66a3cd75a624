//! Subcommands and the session plumbing they share

use std::path::PathBuf;

use clap::Args;
use ruletree_core::{RuleTreeConfig, RuleTreeSession, VariantTag};
use ruletree_store::SqliteRuleRepository;

pub mod create;
pub mod delete;
pub mod duplicate;
pub mod r#move;
pub mod tree;

/// Hierarchy a command operates on
#[derive(Debug, Args)]
pub struct ScopeArgs {
    /// Owner of the hierarchy (intervention, parent rule or decision point id)
    #[arg(long)]
    pub scope: String,

    /// Rule variant: top_level, reply_sub or dialog_step
    #[arg(long)]
    pub variant: VariantTag,
}

/// Settings resolved from the config file and global flags
#[derive(Debug)]
pub struct Context {
    pub config: RuleTreeConfig,
}

impl Context {
    pub fn new(mut config: RuleTreeConfig, db_override: Option<PathBuf>) -> Self {
        if let Some(db) = db_override {
            config.store.database = db;
        }
        Self { config }
    }

    /// Open the store and load the requested hierarchy
    pub fn open_session(
        &self,
        scope: &ScopeArgs,
    ) -> Result<RuleTreeSession, Box<dyn std::error::Error>> {
        tracing::debug!(
            database = %self.config.store.database.display(),
            scope = %scope.scope,
            variant = %scope.variant,
            "opening rule store"
        );
        let mut repo = SqliteRuleRepository::open(&self.config.store.database, scope.variant)?;
        if let Some(dir) = &self.config.store.export_dir {
            repo = repo.with_export_dir(dir);
        }

        let session = RuleTreeSession::initialize(
            scope.scope.as_str(),
            scope.variant,
            Box::new(repo),
            self.config.session,
        )?;

        for id in &session.last_load_report().pruned {
            println!("Pruned orphan rule {}", id);
        }
        for id in &session.last_load_report().prune_failures {
            eprintln!("Warning: could not prune orphan rule {}", id);
        }

        Ok(session)
    }
}
