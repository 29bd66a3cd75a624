//! Operation boundary macros
//!
//! Each expands to one `tracing` event carrying `component`, `op` and `event`.
//! Extra `key = value` fields may follow the required arguments.

#[doc(hidden)]
pub use ruletree_core_types::schema as __schema;

/// Emit the `start` event of `op`
///
/// ```
/// # use ruletree_core::log_op_start;
/// log_op_start!("drop_gesture");
/// log_op_start!("drop_gesture", rule_id = "r1", zone = "middle");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)+)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::logging_facility::macros::__schema::EVENT_START,
            $($($field)+)?
        )
    };
}

/// Emit the `end` event of `op` with its duration
///
/// ```
/// # use ruletree_core::log_op_end;
/// log_op_end!("drop_gesture", duration_ms = 3);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)+)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::logging_facility::macros::__schema::EVENT_END,
            duration_ms = $duration,
            $($($field)+)?
        )
    };
}

/// Emit the `end_error` event of `op`
///
/// The error is classified through `ExError`, so `$err` may be a
/// `RuleTreeError`, a `&RuleTreeError` or an `ExError`.
///
/// ```
/// # use ruletree_core::{log_op_error, errors::RuleTreeError};
/// let err = RuleTreeError::RuleNotFound { rule_id: "r1".to_string() };
/// log_op_error!("delete", &err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)+)?) => {{
        let classified: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::logging_facility::macros::__schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?classified.kind(),
            err_code = classified.code(),
            err_message = %classified,
            $($($field)+)?
        )
    }};
}
