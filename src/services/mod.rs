//! Service layer: git access, caching, providers, and session orchestration.

pub mod cache;
pub mod git;
pub mod provider;
pub mod quiz;
pub mod review;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;
