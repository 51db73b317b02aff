//! Commit readiness quiz: generation, grading, and validation.

pub mod generator;
pub mod service;

pub use generator::{build_quiz_prompt, normalize_quiz_payload};
pub use service::QuizService;
