//! Structured logging facility for RuleTree
//!
//! - Single initialization point via `init(profile)`
//! - Operation boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - In-memory capture for tests
//!
//! # Usage
//!
//! ```rust
//! use ruletree_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! Session operations wrap their body in a start/end pair; failures are
//! reported through `log_op_error!`, which classifies the error through
//! `ExError` so every failure event carries `err_kind` and `err_code`.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
