//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names identical across the core, the store and
//! the CLI host so log queries do not depend on which layer emitted an event.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_SESSION_ID: &str = "session_id";
pub const FIELD_REQUEST_ID: &str = "request_id";

// Hierarchy identifiers
pub const FIELD_RULE_ID: &str = "rule_id";
pub const FIELD_PARENT_ID: &str = "parent_id";
pub const FIELD_SCOPE: &str = "scope";
pub const FIELD_VARIANT: &str = "variant";
pub const FIELD_MOVE_KIND: &str = "move_kind";

// Load statistics
pub const FIELD_LOADED: &str = "loaded";
pub const FIELD_PRUNED: &str = "pruned";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Hierarchy maintenance events
pub const EVENT_ORPHAN_PRUNED: &str = "orphan_pruned";
pub const EVENT_PRUNE_FAILED: &str = "prune_failed";
pub const EVENT_DUPLICATE_NODE: &str = "duplicate_node";
pub const EVENT_DROP_REJECTED: &str = "drop_rejected";
pub const EVENT_MOVE_ROLLED_BACK: &str = "move_rolled_back";
