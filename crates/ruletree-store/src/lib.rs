//! RuleTree Store - SQLite persistence for rule hierarchies
//!
//! Provides:
//! - SQLite schema with a checksummed migrations framework
//! - `SqliteRuleRepository`, the `RuleHierarchyRepository` backend used by the CLI
//! - Optional spilling of exported subtrees to files

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use errors::Result;
pub use repo::SqliteRuleRepository;
