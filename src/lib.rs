//! Commit Gate
//!
//! Session-orchestration core for an AI-assisted pre-commit gate. Before a
//! commit goes through, the developer either passes a generated readiness
//! quiz about their own changes or runs a panel of review specialists over
//! the diff. This crate owns the async core of that flow: the session store
//! and its eviction rules, the one-live-run-per-slot supervisor, the
//! per-session event stream, the quiz and review orchestrators, and the
//! cached, write-serialized git layer they read from.
//!
//! The outer transport (CLI, IPC, HTTP) and the concrete AI provider both
//! plug in from outside: the transport talks to [`AppState`], the provider
//! implements [`services::provider::AgentProvider`].

pub mod models;
pub mod services;
pub mod state;
pub mod utils;

pub use state::AppState;
pub use utils::error::{AppError, AppResult};
