//! Shared utilities: error types and timeout helpers.

pub mod error;
pub mod timeout;
