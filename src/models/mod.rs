//! Data models shared across services and the external routing layer.

pub mod events;
pub mod finding;
pub mod quiz;
pub mod session;

pub use events::SessionEvent;
pub use finding::{Finding, FindingType, Severity};
pub use quiz::{Quiz, QuizGrade, QuizQuestion};
pub use session::{
    GateSession, QuizResult, ReviewResult, SessionFailure, SessionProgress, SessionResult,
    SessionSlot, SessionStatus,
};
