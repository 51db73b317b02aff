//! Session orchestration primitives: store, event channel, run supervisor.

pub mod events;
pub mod store;
pub mod supervisor;

pub use events::EventHub;
pub use store::{SessionStore, SESSION_CAP, SESSION_TTL};
pub use supervisor::RunSupervisor;
