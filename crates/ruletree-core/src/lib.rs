//! RuleTree Core - hierarchy engine for condition/consequence rule trees
//!
//! This crate owns the in-memory side of a rule editor session:
//! - Rule model, variant tags and the opaque rule payload
//! - Ordered in-memory forest (`RuleTree`) with insert-after-sibling primitives
//! - Repository seam (`RuleHierarchyRepository`) plus an in-memory backend
//! - Variant resolution bound once per session
//! - Loading with orphan pruning, icon derivation, drag-and-drop reordering
//! - The session controller that coordinates all of the above
//!
//! Persistence lives in `ruletree-store`; the host binary in `ruletree-cli`.

pub mod config;
pub mod errors;
pub mod loader;
pub mod logging_facility;
pub mod model;
pub mod presentation;
pub mod reorder;
pub mod repository;
pub mod session;
pub mod tree;
pub mod variant;

// Re-export commonly used types
pub use config::{RuleTreeConfig, SessionOptions};
pub use errors::{ExError, ExErrorKind, Result, RuleTreeError};
pub use loader::LoadReport;
pub use model::{
    EquationSign, ExportBlob, IconCategory, MoveKind, RuleBundle, RuleCategory, RuleNode,
    RulePayload, RuleRecord, VariantTag, VerticalZone,
};
pub use presentation::{ConditionLabeler, RuleLabeler};
pub use reorder::{DropOutcome, DropRejection, PlannedMove};
pub use repository::{MemoryRuleRepository, RuleHierarchyRepository};
pub use session::{DuplicateOutcome, RuleEditor, RuleTreeSession};
pub use tree::RuleTree;
pub use variant::{resolve, RuleVariantOperations};
