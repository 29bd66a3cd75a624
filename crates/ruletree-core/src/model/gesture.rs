use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::RuleTreeError;

/// Structural move sent to the backend
///
/// The ordinal codes are part of the backend contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    AsChild,
    Above,
    Below,
}

impl MoveKind {
    pub fn code(&self) -> u8 {
        match self {
            MoveKind::AsChild => 0,
            MoveKind::Above => 1,
            MoveKind::Below => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(MoveKind::AsChild),
            1 => Some(MoveKind::Above),
            2 => Some(MoveKind::Below),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MoveKind::AsChild => "as_child",
            MoveKind::Above => "above",
            MoveKind::Below => "below",
        }
    }
}

impl fmt::Display for MoveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a drag ended relative to the target row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalZone {
    Top,
    Middle,
    Bottom,
}

impl VerticalZone {
    /// Backend move that a drop in this zone produces
    pub fn move_kind(&self) -> MoveKind {
        match self {
            VerticalZone::Top => MoveKind::Above,
            VerticalZone::Middle => MoveKind::AsChild,
            VerticalZone::Bottom => MoveKind::Below,
        }
    }
}

impl FromStr for VerticalZone {
    type Err = RuleTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(VerticalZone::Top),
            "middle" => Ok(VerticalZone::Middle),
            "bottom" => Ok(VerticalZone::Bottom),
            other => Err(RuleTreeError::InvalidInput {
                reason: format!("unknown drop zone '{}' (expected top, middle or bottom)", other),
            }),
        }
    }
}
