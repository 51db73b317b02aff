//! Git collaborators: CLI wrapper, cached reads, serialized writes.

pub mod mutation;
pub mod ops;
pub mod service;
pub mod types;

pub use mutation::MutationQueue;
pub use ops::{GitOps, GitResult};
pub use service::GitService;
pub use types::{ChangedFile, GitContext, PromptContext, RemoteState, RepoMode, StatusSummary};
