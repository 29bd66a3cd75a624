//! Error handling for ruletree-store
//!
//! Store failures surface as core `RuleTreeError`s so the repository trait
//! can return them unchanged.

use ruletree_core::errors::RuleTreeError;

pub use ruletree_core::errors::Result;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> RuleTreeError {
    RuleTreeError::Persistence {
        op: "migration".to_string(),
        message: format!("Migration {} failed: {}", migration_id, reason),
    }
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> RuleTreeError {
    RuleTreeError::Persistence {
        op: "migration_checksum".to_string(),
        message: format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ),
    }
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> RuleTreeError {
    RuleTreeError::Persistence {
        op: "sqlite".to_string(),
        message: err.to_string(),
    }
}

/// Map a rusqlite error while naming the repository operation
pub fn sqlite_op(op: &'static str) -> impl Fn(rusqlite::Error) -> RuleTreeError {
    move |err| RuleTreeError::Persistence {
        op: op.to_string(),
        message: err.to_string(),
    }
}

/// A stored payload or variant that no longer decodes
pub fn corrupt_row(rule_id: &str, reason: impl std::fmt::Display) -> RuleTreeError {
    RuleTreeError::Persistence {
        op: "decode_rule".to_string(),
        message: format!("Rule {} is unreadable: {}", rule_id, reason),
    }
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> RuleTreeError {
    RuleTreeError::Io {
        op: operation.to_string(),
        message: err.to_string(),
    }
}
