//! File-based configuration
//!
//! Parses a TOML document with `[logging]`, `[store]` and `[session]`
//! tables. Every key is optional; a missing file section falls back to its
//! defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{Result, RuleTreeError};
use crate::logging_facility::Profile;

/// Default location of the rule database, relative to the working directory
pub const DEFAULT_DATABASE: &str = ".ruletree/rules.db";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleTreeConfig {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub session: SessionOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub profile: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub database: PathBuf,
    /// Directory for spilled export files; exports stay in memory when unset
    pub export_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            export_dir: None,
        }
    }
}

/// Behaviour switches for a `RuleTreeSession`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionOptions {
    /// Restore the tree when the backend refuses a move
    pub rollback_failed_moves: bool,
    /// Refuse drops that would put a rule under its own descendant
    pub reject_descendant_drops: bool,
    /// Remember the last drag-eligibility answer until the tree changes
    pub memoize_drag_eligibility: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            rollback_failed_moves: true,
            reject_descendant_drops: true,
            memoize_drag_eligibility: true,
        }
    }
}

impl RuleTreeConfig {
    /// Parse a configuration document
    ///
    /// # Errors
    ///
    /// Returns `Config` on malformed TOML, unknown keys or invalid values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RuleTreeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RuleTreeError::Config {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if given, otherwise return defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.store.database.as_os_str().is_empty() {
            return Err(RuleTreeError::Config {
                reason: "store.database must not be empty".to_string(),
            });
        }
        if let Some(dir) = &self.store.export_dir {
            if dir.as_os_str().is_empty() {
                return Err(RuleTreeError::Config {
                    reason: "store.export_dir must not be empty when set".to_string(),
                });
            }
        }
        Ok(())
    }
}
