#![allow(clippy::unwrap_used, clippy::expect_used)]

use ruletree_core::errors::{ExErrorKind, RuleTreeError};
use ruletree_core::logging_facility::test_capture::init_test_capture;
use ruletree_core::{log_op_end, log_op_error, log_op_start};
use ruletree_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "logging_start_unique_1";

    log_op_start!(op_name, rule_id = "r1");

    capture.assert_event_exists(op_name, EVENT_START);
    let events = capture.events();
    let start = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name))
        .expect("start event");
    assert_eq!(start.field("rule_id"), Some("r1"));
    assert!(start
        .component
        .as_deref()
        .is_some_and(|c| c.starts_with("logging_facility_tests")));
}

#[test]
fn test_log_op_end_carries_duration() {
    let capture = init_test_capture();
    let op_name = "logging_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let ends: Vec<_> = capture
        .events()
        .into_iter()
        .filter(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END))
        .collect();
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_classifies_error() {
    let capture = init_test_capture();
    let op_name = "logging_error_unique_3";

    let err = RuleTreeError::CycleDetected {
        rule_id: "r1".to_string(),
        parent_id: "r2".to_string(),
    };
    log_op_error!(op_name, &err, duration_ms = 7);

    let events = capture.events();
    let error_event = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("error event");
    assert_eq!(error_event.level, tracing::Level::ERROR);
    assert_eq!(error_event.field("err_code"), Some("ERR_CYCLE_DETECTED"));
    assert_eq!(
        error_event.field("err_kind"),
        Some(format!("{:?}", ExErrorKind::CycleDetected).as_str())
    );
    assert!(error_event
        .field("err_message")
        .is_some_and(|m| m.contains("r2 is a descendant")));
}

#[test]
fn test_single_start_end_pair_per_operation() {
    let capture = init_test_capture();
    let op_name = "logging_boundary_unique_4";

    log_op_start!(op_name);
    log_op_end!(op_name, duration_ms = 1, rule_id = "r1");

    let count = |event: &str| {
        capture.count_events(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(event))
    };
    assert_eq!(count(EVENT_START), 1);
    assert_eq!(count(EVENT_END), 1);
    assert_eq!(count(EVENT_END_ERROR), 0);
}

#[test]
#[should_panic(expected = "Expected event")]
fn test_assert_event_exists_fails_for_missing_event() {
    let capture = init_test_capture();
    capture.assert_event_exists("logging_never_emitted_unique_5", EVENT_START);
}
