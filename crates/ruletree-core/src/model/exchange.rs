//! Export/import exchange document
//!
//! A bundle holds one exported subtree in pre-order (root first). Importing
//! re-issues every id and rewires parent pointers inside the bundle; the root
//! keeps the parent it had when it was exported.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::rule::RuleRecord;
use crate::errors::{Result, RuleTreeError};

pub const BUNDLE_FORMAT: &str = "ruletree-rules";
pub const BUNDLE_VERSION: u32 = 1;

/// Result of an export, handed back unchanged to import
///
/// When the backend spills the export to disk, `spill_path` names the file so
/// it can be removed once the duplicate flow is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBlob {
    pub bytes: Vec<u8>,
    pub spill_path: Option<PathBuf>,
}

impl ExportBlob {
    pub fn in_memory(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            spill_path: None,
        }
    }

    pub fn spilled(bytes: Vec<u8>, path: PathBuf) -> Self {
        Self {
            bytes,
            spill_path: Some(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleBundle {
    pub format: String,
    pub version: u32,
    pub rules: Vec<RuleRecord>,
}

impl RuleBundle {
    pub fn new(rules: Vec<RuleRecord>) -> Self {
        Self {
            format: BUNDLE_FORMAT.to_string(),
            version: BUNDLE_VERSION,
            rules,
        }
    }

    /// Walk the subtree under `root` in pre-order using `children_of`
    ///
    /// `children_of` must return children in sibling order.
    pub fn collect<F>(root: RuleRecord, mut children_of: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<Vec<RuleRecord>>,
    {
        let mut rules = Vec::new();
        let mut stack = vec![root];
        while let Some(record) = stack.pop() {
            let mut children = children_of(&record.id)?;
            rules.push(record);
            children.reverse();
            stack.extend(children);
        }
        Ok(Self::new(rules))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decode and validate a bundle
    ///
    /// # Errors
    ///
    /// Returns `InvalidExport` for a foreign format or an unsupported version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bundle: RuleBundle =
            serde_json::from_slice(bytes).map_err(|e| RuleTreeError::InvalidExport {
                reason: e.to_string(),
            })?;
        if bundle.format != BUNDLE_FORMAT {
            return Err(RuleTreeError::InvalidExport {
                reason: format!("unexpected format '{}'", bundle.format),
            });
        }
        if bundle.version != BUNDLE_VERSION {
            return Err(RuleTreeError::InvalidExport {
                reason: format!("unsupported version {}", bundle.version),
            });
        }
        Ok(bundle)
    }

    /// Produce import-ready records with fresh ids
    ///
    /// Returns an empty vector for an empty bundle. The first record is the
    /// new subtree root; its `order` is left for the backend to assign.
    ///
    /// # Errors
    ///
    /// Returns `InvalidExport` when a non-root record's parent is not an
    /// earlier record of the bundle.
    pub fn reissue<F>(self, mut fresh_id: F) -> Result<Vec<RuleRecord>>
    where
        F: FnMut() -> String,
    {
        let mut id_map: HashMap<String, String> = HashMap::new();
        let mut out = Vec::with_capacity(self.rules.len());

        for (index, mut record) in self.rules.into_iter().enumerate() {
            let new_id = fresh_id();
            id_map.insert(record.id.clone(), new_id.clone());
            if index > 0 {
                let old_parent = record.parent_id.take().ok_or_else(|| {
                    RuleTreeError::InvalidExport {
                        reason: format!("rule {} has no parent inside the bundle", record.id),
                    }
                })?;
                let new_parent =
                    id_map
                        .get(&old_parent)
                        .cloned()
                        .ok_or_else(|| RuleTreeError::InvalidExport {
                            reason: format!(
                                "rule {} references {} before it appears",
                                record.id, old_parent
                            ),
                        })?;
                record.parent_id = Some(new_parent);
            }
            record.id = new_id;
            out.push(record);
        }

        Ok(out)
    }
}
