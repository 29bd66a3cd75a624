//! Node presentation
//!
//! Icons come from a fixed priority table per variant: the first entry that
//! matches wins, so a rule that both stops a dialog and jumps elsewhere shows
//! the stop icon. Labels come from a pluggable `RuleLabeler`.

use crate::model::{IconCategory, RuleCategory, RuleNode, RulePayload, RuleRecord, VariantTag};

/// Placeholder for an empty condition term
pub const EMPTY_TERM: &str = "---";

type IconRule = fn(&RulePayload) -> Option<IconCategory>;

const TOP_LEVEL_ICONS: &[IconRule] = &[
    message_icon,
    stops_intervention_icon,
    category_icon,
    case_solved_icon,
];

const REPLY_SUB_ICONS: &[IconRule] = &[message_icon, category_icon, case_solved_icon];

const DIALOG_STEP_ICONS: &[IconRule] = &[
    message_icon,
    stops_dialog_icon,
    redirect_icon,
    leaves_decision_point_icon,
];

fn message_icon(p: &RulePayload) -> Option<IconCategory> {
    p.emits_message().then_some(if p.sends_to_supervisor {
        IconCategory::SupervisorMessage
    } else {
        IconCategory::ParticipantMessage
    })
}

fn stops_intervention_icon(p: &RulePayload) -> Option<IconCategory> {
    p.stops_intervention.then_some(IconCategory::Stop)
}

fn category_icon(p: &RulePayload) -> Option<IconCategory> {
    match p.category {
        RuleCategory::Normal => None,
        RuleCategory::Daily => Some(IconCategory::Daily),
        RuleCategory::Periodic => Some(IconCategory::Periodic),
        RuleCategory::UnexpectedMessage => Some(IconCategory::UnexpectedMessage),
        RuleCategory::UserIntention => Some(IconCategory::UserIntention),
    }
}

fn case_solved_icon(p: &RulePayload) -> Option<IconCategory> {
    p.marks_case_solved.then_some(IconCategory::Solved)
}

fn stops_dialog_icon(p: &RulePayload) -> Option<IconCategory> {
    p.stops_dialog.then_some(IconCategory::Stop)
}

fn redirect_icon(p: &RulePayload) -> Option<IconCategory> {
    p.has_jump_target().then_some(IconCategory::Redirect)
}

fn leaves_decision_point_icon(p: &RulePayload) -> Option<IconCategory> {
    p.leaves_decision_point.then_some(IconCategory::Solved)
}

/// Pick the icon for a rule's content
pub fn derive_icon(payload: &RulePayload, variant: VariantTag) -> IconCategory {
    let table = match variant {
        VariantTag::TopLevel => TOP_LEVEL_ICONS,
        VariantTag::ReplySub => REPLY_SUB_ICONS,
        VariantTag::DialogStep => DIALOG_STEP_ICONS,
    };
    table
        .iter()
        .find_map(|rule| rule(payload))
        .unwrap_or(IconCategory::Default)
}

/// Builds the text shown for a rule in the tree
pub trait RuleLabeler {
    fn label(&self, payload: &RulePayload, variant: VariantTag) -> String;
}

impl<F> RuleLabeler for F
where
    F: Fn(&RulePayload, VariantTag) -> String,
{
    fn label(&self, payload: &RulePayload, variant: VariantTag) -> String {
        self(payload, variant)
    }
}

/// Renders `<expression> <sign> <comparison term>`
///
/// Empty terms show as `---`, except for signs whose result is constant,
/// where the missing term is simply left out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionLabeler;

impl RuleLabeler for ConditionLabeler {
    fn label(&self, payload: &RulePayload, _variant: VariantTag) -> String {
        let constant = payload.equation_sign.has_constant_result();
        let mut name = String::new();

        if !payload.expression.is_empty() {
            name.push_str(&payload.expression);
            name.push(' ');
        } else if !constant {
            name.push_str(EMPTY_TERM);
            name.push(' ');
        }

        name.push_str(payload.equation_sign.as_str());

        if !payload.comparison_term.is_empty() {
            name.push(' ');
            name.push_str(&payload.comparison_term);
        } else if !constant {
            name.push(' ');
            name.push_str(EMPTY_TERM);
        }

        name
    }
}

/// Turn a backend record into a tree node with derived label and icon
pub fn present(record: &RuleRecord, labeler: &dyn RuleLabeler) -> RuleNode {
    RuleNode {
        id: record.id.clone(),
        parent_id: record.parent_id.clone(),
        variant: record.variant,
        payload: record.payload.clone(),
        label: labeler.label(&record.payload, record.variant),
        icon: derive_icon(&record.payload, record.variant),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EquationSign;

    #[test]
    fn test_plain_rule_gets_default_icon() {
        for variant in VariantTag::ALL {
            assert_eq!(
                derive_icon(&RulePayload::default(), variant),
                IconCategory::Default
            );
        }
    }

    #[test]
    fn test_supervisor_beats_everything() {
        let payload = RulePayload {
            sends_message: true,
            sends_to_supervisor: true,
            stops_intervention: true,
            stops_dialog: true,
            category: RuleCategory::Daily,
            ..RulePayload::default()
        };
        for variant in VariantTag::ALL {
            assert_eq!(derive_icon(&payload, variant), IconCategory::SupervisorMessage);
        }
    }

    #[test]
    fn test_activating_dialog_counts_as_message() {
        let payload = RulePayload {
            activates_dialog: true,
            ..RulePayload::default()
        };
        assert_eq!(
            derive_icon(&payload, VariantTag::TopLevel),
            IconCategory::ParticipantMessage
        );
    }

    #[test]
    fn test_stop_intervention_only_for_top_level() {
        let payload = RulePayload {
            stops_intervention: true,
            marks_case_solved: true,
            ..RulePayload::default()
        };
        assert_eq!(derive_icon(&payload, VariantTag::TopLevel), IconCategory::Stop);
        assert_eq!(derive_icon(&payload, VariantTag::ReplySub), IconCategory::Solved);
    }

    #[test]
    fn test_category_precedes_case_solved() {
        let payload = RulePayload {
            category: RuleCategory::Periodic,
            marks_case_solved: true,
            ..RulePayload::default()
        };
        assert_eq!(
            derive_icon(&payload, VariantTag::TopLevel),
            IconCategory::Periodic
        );
    }

    #[test]
    fn test_dialog_stop_beats_redirect() {
        let payload = RulePayload {
            stops_dialog: true,
            next_step_on_true: Some("step-2".to_string()),
            ..RulePayload::default()
        };
        assert_eq!(derive_icon(&payload, VariantTag::DialogStep), IconCategory::Stop);
    }

    #[test]
    fn test_dialog_redirect_beats_leaving() {
        let payload = RulePayload {
            next_step_on_false: Some("step-3".to_string()),
            leaves_decision_point: true,
            ..RulePayload::default()
        };
        assert_eq!(
            derive_icon(&payload, VariantTag::DialogStep),
            IconCategory::Redirect
        );
    }

    #[test]
    fn test_label_with_terms() {
        let payload = RulePayload {
            expression: "$mood".to_string(),
            equation_sign: EquationSign::CalculatedValueIsBiggerThan,
            comparison_term: "3".to_string(),
            ..RulePayload::default()
        };
        assert_eq!(
            ConditionLabeler.label(&payload, VariantTag::TopLevel),
            "$mood calculated value is bigger than 3"
        );
    }

    #[test]
    fn test_label_placeholders() {
        assert_eq!(
            ConditionLabeler.label(&RulePayload::default(), VariantTag::ReplySub),
            "--- calculated value equals ---"
        );

        let constant = RulePayload {
            equation_sign: EquationSign::CalculateValueButResultIsAlwaysTrue,
            ..RulePayload::default()
        };
        assert_eq!(
            ConditionLabeler.label(&constant, VariantTag::ReplySub),
            "calculate value but result is always true"
        );
    }

    #[test]
    fn test_present_uses_labeler_and_deriver() {
        let record = RuleRecord::new("r1", "s", VariantTag::DialogStep, Some("p".to_string()))
            .with_payload(RulePayload {
                leaves_decision_point: true,
                ..RulePayload::default()
            });
        let labeler = |_: &RulePayload, v: VariantTag| format!("custom {}", v);
        let node = present(&record, &labeler);

        assert_eq!(node.id, "r1");
        assert_eq!(node.parent_id.as_deref(), Some("p"));
        assert_eq!(node.label, "custom dialog_step");
        assert_eq!(node.icon, IconCategory::Solved);
    }
}
