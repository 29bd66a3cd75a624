//! Core types shared across RuleTree facilities
//!
//! This crate provides the small vocabulary that both the error facility and
//! the logging facility depend on:
//!
//! - **Correlation types**: SessionId, RequestId
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::{RequestId, SessionId};
