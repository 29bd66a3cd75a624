use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::payload::RulePayload;
use crate::errors::RuleTreeError;

/// The three rule kinds that share one hierarchy engine
///
/// - `TopLevel`: monitoring rules owned by an intervention
/// - `ReplySub`: rules evaluated against a participant's reply to a message
/// - `DialogStep`: rules inside a micro-dialog decision point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantTag {
    TopLevel,
    ReplySub,
    DialogStep,
}

impl VariantTag {
    pub const ALL: [VariantTag; 3] = [
        VariantTag::TopLevel,
        VariantTag::ReplySub,
        VariantTag::DialogStep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantTag::TopLevel => "top_level",
            VariantTag::ReplySub => "reply_sub",
            VariantTag::DialogStep => "dialog_step",
        }
    }
}

impl fmt::Display for VariantTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariantTag {
    type Err = RuleTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        VariantTag::ALL
            .into_iter()
            .find(|v| v.as_str() == normalized)
            .ok_or_else(|| RuleTreeError::InvalidInput {
                reason: format!(
                    "unknown rule variant '{}' (expected top_level, reply_sub or dialog_step)",
                    s
                ),
            })
    }
}

/// A rule as the repository persists it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    /// Opaque unique identifier (UUID v7 for rules created by this crate)
    pub id: String,

    /// Owner of the hierarchy this rule belongs to
    pub scope: String,

    pub variant: VariantTag,

    /// None for roots
    pub parent_id: Option<String>,

    /// Position among siblings, maintained by the backend
    pub order: u32,

    pub payload: RulePayload,
}

impl RuleRecord {
    pub fn new(
        id: impl Into<String>,
        scope: impl Into<String>,
        variant: VariantTag,
        parent_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            scope: scope.into(),
            variant,
            parent_id,
            order: 0,
            payload: RulePayload::default(),
        }
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn with_payload(mut self, payload: RulePayload) -> Self {
        self.payload = payload;
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Icon shown next to a rule in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconCategory {
    SupervisorMessage,
    ParticipantMessage,
    Stop,
    Daily,
    Periodic,
    UnexpectedMessage,
    UserIntention,
    Solved,
    Redirect,
    Default,
}

impl IconCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IconCategory::SupervisorMessage => "supervisor_message",
            IconCategory::ParticipantMessage => "participant_message",
            IconCategory::Stop => "stop",
            IconCategory::Daily => "daily",
            IconCategory::Periodic => "periodic",
            IconCategory::UnexpectedMessage => "unexpected_message",
            IconCategory::UserIntention => "user_intention",
            IconCategory::Solved => "solved",
            IconCategory::Redirect => "redirect",
            IconCategory::Default => "default",
        }
    }
}

impl fmt::Display for IconCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule as it lives in the in-memory tree: content plus derived presentation
#[derive(Debug, Clone, PartialEq)]
pub struct RuleNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub variant: VariantTag,
    pub payload: RulePayload,
    pub label: String,
    pub icon: IconCategory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_parses_snake_and_kebab_case() {
        assert_eq!("top_level".parse::<VariantTag>().unwrap(), VariantTag::TopLevel);
        assert_eq!("reply-sub".parse::<VariantTag>().unwrap(), VariantTag::ReplySub);
        assert_eq!(
            " Dialog_Step ".parse::<VariantTag>().unwrap(),
            VariantTag::DialogStep
        );
    }

    #[test]
    fn test_unknown_variant_is_invalid_input() {
        let err = "screening".parse::<VariantTag>().unwrap_err();
        assert!(matches!(err, RuleTreeError::InvalidInput { .. }));
    }

    #[test]
    fn test_new_record_is_root_with_defaults() {
        let record = RuleRecord::new("r1", "scope-a", VariantTag::TopLevel, None);
        assert!(record.is_root());
        assert_eq!(record.order, 0);
        assert_eq!(record.payload, RulePayload::default());
    }

    #[test]
    fn test_variant_serializes_snake_case() {
        let json = serde_json::to_string(&VariantTag::DialogStep).unwrap();
        assert_eq!(json, "\"dialog_step\"");
    }
}
