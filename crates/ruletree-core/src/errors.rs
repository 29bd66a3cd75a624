use ruletree_core_types::{RequestId, SessionId};
use thiserror::Error;

/// Result type alias using RuleTreeError
pub type Result<T> = std::result::Result<T, RuleTreeError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every `RuleTreeError` maps onto exactly one kind, and every kind has a
/// stable `ERR_*` code that hosts and tests can match on without parsing
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input
    InvalidInput,
    NotFound,
    AlreadyExists,
    // Session state
    NotInTree,
    NothingSelected,
    // Structure
    NotSiblings,
    CycleDetected,
    // Exchange
    InvalidExport,
    // Integration/IO
    Config,
    Io,
    Serialization,
    Persistence,
    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::NotInTree => "ERR_NOT_IN_TREE",
            ExErrorKind::NothingSelected => "ERR_NOTHING_SELECTED",
            ExErrorKind::NotSiblings => "ERR_NOT_SIBLINGS",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::InvalidExport => "ERR_INVALID_EXPORT",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification used by log events (`err_kind`, `err_code`)
/// together with optional correlation context for the host.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    session_id: Option<SessionId>,
    request_id: Option<RequestId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            session_id: None,
            request_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context (a rule id in practice)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (rule_id: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for rule hierarchy operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleTreeError {
    // ===== Lookup Errors =====
    /// Rule does not exist in the backend
    #[error("Rule not found: {rule_id}")]
    RuleNotFound { rule_id: String },

    /// A create/insert named a parent that does not exist
    #[error("Parent rule not found: {parent_id}")]
    ParentNotFound { parent_id: String },

    // ===== In-memory Tree Errors =====
    /// Attempt to insert a node id that the tree already holds
    #[error("Rule {rule_id} is already present in the tree")]
    RuleAlreadyInTree { rule_id: String },

    /// Rule id is not part of the in-memory tree
    #[error("Rule {rule_id} is not present in the tree")]
    RuleNotInTree { rule_id: String },

    /// Insert-after-sibling named a node under a different parent
    #[error("Rule {sibling_id} is not a sibling of {rule_id}")]
    NotSiblings { rule_id: String, sibling_id: String },

    /// Reparenting would make a rule its own ancestor
    #[error("Moving rule {rule_id} under {parent_id} would create a cycle")]
    CycleDetected { rule_id: String, parent_id: String },

    // ===== Session Errors =====
    /// Operation requires a selected rule
    #[error("Operation '{op}' requires a selected rule")]
    NothingSelected { op: String },

    // ===== Input Errors =====
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Export blob could not be decoded for import
    #[error("Invalid export: {reason}")]
    InvalidExport { reason: String },

    // ===== Integration Errors =====
    #[error("Persistence error in {op}: {message}")]
    Persistence { op: String, message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("IO error in {op}: {message}")]
    Io { op: String, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<RuleTreeError> for ExError {
    fn from(err: RuleTreeError) -> Self {
        match err {
            RuleTreeError::RuleNotFound { rule_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(rule_id)
                .with_message("Rule not found"),

            RuleTreeError::ParentNotFound { parent_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(parent_id)
                .with_op("find_parent")
                .with_message("Parent rule not found"),

            RuleTreeError::RuleAlreadyInTree { rule_id } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_entity_id(rule_id)
                    .with_message("Rule already present in tree")
            }

            RuleTreeError::RuleNotInTree { rule_id } => ExError::new(ExErrorKind::NotInTree)
                .with_entity_id(rule_id)
                .with_message("Rule not present in tree"),

            RuleTreeError::NotSiblings {
                rule_id,
                sibling_id,
            } => ExError::new(ExErrorKind::NotSiblings)
                .with_entity_id(rule_id)
                .with_message(format!("{} is not a sibling", sibling_id)),

            RuleTreeError::CycleDetected { rule_id, parent_id } => {
                ExError::new(ExErrorKind::CycleDetected)
                    .with_entity_id(rule_id)
                    .with_op("set_parent")
                    .with_message(format!("{} is a descendant", parent_id))
            }

            RuleTreeError::NothingSelected { op } => ExError::new(ExErrorKind::NothingSelected)
                .with_op(op)
                .with_message("No rule selected"),

            RuleTreeError::InvalidInput { reason } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(reason)
            }

            RuleTreeError::InvalidExport { reason } => ExError::new(ExErrorKind::InvalidExport)
                .with_op("import")
                .with_message(reason),

            RuleTreeError::Persistence { op, message } => ExError::new(ExErrorKind::Persistence)
                .with_op(op)
                .with_message(message),

            RuleTreeError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            RuleTreeError::Config { reason } => ExError::new(ExErrorKind::Config)
                .with_op("load_config")
                .with_message(reason),

            RuleTreeError::Io { op, message } => ExError::new(ExErrorKind::Io)
                .with_op(op)
                .with_message(message),

            RuleTreeError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

impl From<&RuleTreeError> for ExError {
    fn from(err: &RuleTreeError) -> Self {
        ExError::from(err.clone())
    }
}

/// Conversion from serde_json::Error to RuleTreeError
impl From<serde_json::Error> for RuleTreeError {
    fn from(err: serde_json::Error) -> Self {
        RuleTreeError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for RuleTreeError {
    fn from(err: toml::de::Error) -> Self {
        RuleTreeError::Config {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for RuleTreeError {
    fn from(err: std::io::Error) -> Self {
        RuleTreeError::Io {
            op: "filesystem".to_string(),
            message: err.to_string(),
        }
    }
}
