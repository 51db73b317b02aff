//! Multi-specialist code review: fan-out, normalization, and merge.

pub mod merge;
pub mod service;
pub mod specialists;

pub use merge::merge_findings;
pub use service::ReviewService;
pub use specialists::{build_specialist_prompt, Specialist, SPECIALISTS};
