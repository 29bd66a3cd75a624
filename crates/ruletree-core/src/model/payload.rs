//! Rule content
//!
//! The hierarchy engine never interprets conditions. It only reads the
//! consequence flags to pick an icon and hands the condition terms to the
//! label builder.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison applied between the evaluated expression and the comparison term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquationSign {
    CalculateValueButResultIsAlwaysTrue,
    CalculateValueButResultIsAlwaysFalse,
    CalculatedValueIsSmallerThan,
    CalculatedValueIsSmallerOrEqualThan,
    #[default]
    CalculatedValueEquals,
    CalculatedValueIsBiggerOrEqualThan,
    CalculatedValueIsBiggerThan,
    CreateTextButResultIsAlwaysTrue,
    CreateTextButResultIsAlwaysFalse,
    TextValueEquals,
    TextValueNotEquals,
    TextValueMatchesRegularExpression,
    TextValueNotMatchesRegularExpression,
    DateDifferenceValueEquals,
    CalculateDateDifferenceInDaysAndTrueIfZero,
}

impl EquationSign {
    /// Signs whose outcome does not depend on the comparison term
    pub fn has_constant_result(&self) -> bool {
        matches!(
            self,
            EquationSign::CalculateValueButResultIsAlwaysTrue
                | EquationSign::CalculateValueButResultIsAlwaysFalse
                | EquationSign::CreateTextButResultIsAlwaysTrue
                | EquationSign::CreateTextButResultIsAlwaysFalse
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EquationSign::CalculateValueButResultIsAlwaysTrue => {
                "calculate value but result is always true"
            }
            EquationSign::CalculateValueButResultIsAlwaysFalse => {
                "calculate value but result is always false"
            }
            EquationSign::CalculatedValueIsSmallerThan => "calculated value is smaller than",
            EquationSign::CalculatedValueIsSmallerOrEqualThan => {
                "calculated value is smaller or equal than"
            }
            EquationSign::CalculatedValueEquals => "calculated value equals",
            EquationSign::CalculatedValueIsBiggerOrEqualThan => {
                "calculated value is bigger or equal than"
            }
            EquationSign::CalculatedValueIsBiggerThan => "calculated value is bigger than",
            EquationSign::CreateTextButResultIsAlwaysTrue => {
                "create text but result is always true"
            }
            EquationSign::CreateTextButResultIsAlwaysFalse => {
                "create text but result is always false"
            }
            EquationSign::TextValueEquals => "text value equals",
            EquationSign::TextValueNotEquals => "text value not equals",
            EquationSign::TextValueMatchesRegularExpression => {
                "text value matches regular expression"
            }
            EquationSign::TextValueNotMatchesRegularExpression => {
                "text value not matches regular expression"
            }
            EquationSign::DateDifferenceValueEquals => "date difference value equals",
            EquationSign::CalculateDateDifferenceInDaysAndTrueIfZero => {
                "calculate date difference in days and true if zero"
            }
        }
    }
}

impl fmt::Display for EquationSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling class of a top-level rule
///
/// Only `Normal` rules take part in ordered evaluation; the others are
/// triggered by their schedule or event and keep their position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    #[default]
    Normal,
    Daily,
    Periodic,
    UnexpectedMessage,
    UserIntention,
}

/// Opaque rule content
///
/// Flags that do not apply to a variant stay at their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulePayload {
    // Condition
    pub expression: String,
    pub equation_sign: EquationSign,
    pub comparison_term: String,
    pub comment: String,
    pub result_variable: Option<String>,

    // Consequences shared by all variants
    pub sends_message: bool,
    pub activates_dialog: bool,
    pub sends_to_supervisor: bool,

    // Top-level only
    pub category: RuleCategory,
    pub stops_intervention: bool,
    pub marks_case_solved: bool,

    // Dialog-step only
    pub stops_dialog: bool,
    pub next_step_on_true: Option<String>,
    pub next_step_on_false: Option<String>,
    pub leaves_decision_point: bool,
}

impl RulePayload {
    /// Activating a dialog counts as sending a message
    pub fn emits_message(&self) -> bool {
        self.sends_message || self.activates_dialog
    }

    pub fn has_jump_target(&self) -> bool {
        self.next_step_on_true.is_some() || self.next_step_on_false.is_some()
    }
}
