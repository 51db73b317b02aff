//! Git Service
//!
//! High-level repository reads and writes for the orchestration layer.
//! Reads (status, remote ahead/behind, changed files) go through the TTL
//! cache with request coalescing; writes go through the single-lane mutation
//! queue and invalidate the relevant cache keys on success.

use std::path::Path;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::services::cache::TtlCache;
use crate::utils::error::AppResult;

use super::mutation::MutationQueue;
use super::ops::GitOps;
use super::types::*;

/// TTL for repository status reads.
pub const STATUS_TTL: Duration = Duration::from_millis(150);
/// TTL for changed-file listings.
pub const FILES_TTL: Duration = Duration::from_millis(500);
/// TTL for remote ahead/behind counts.
pub const REMOTE_TTL: Duration = Duration::from_secs(2);

/// Longest diff excerpt handed to the provider, in bytes.
const MAX_CONTEXT_BYTES: usize = 48_000;

/// High-level git service.
pub struct GitService {
    git: GitOps,
    status_cache: TtlCache<StatusSummary>,
    files_cache: TtlCache<Vec<String>>,
    remote_cache: TtlCache<RemoteState>,
    mutations: MutationQueue,
}

impl Default for GitService {
    fn default() -> Self {
        Self::new()
    }
}

impl GitService {
    pub fn new() -> Self {
        Self {
            git: GitOps::new(),
            status_cache: TtlCache::new(),
            files_cache: TtlCache::new(),
            remote_cache: TtlCache::new(),
            mutations: MutationQueue::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Context
    // -----------------------------------------------------------------------

    /// Resolve repository root, branch, and working mode.
    pub async fn resolve_context(&self, path: &Path) -> AppResult<GitContext> {
        let repo_root = self.git.repo_root(path).await?;
        let branch = self.git.current_branch(path).await?;
        let mode = if self.git.merge_in_progress(path).await? {
            RepoMode::Merging
        } else if branch == "HEAD" {
            RepoMode::Detached
        } else {
            RepoMode::Normal
        };
        Ok(GitContext {
            repo_root,
            branch,
            mode,
        })
    }

    // -----------------------------------------------------------------------
    // Cached reads
    // -----------------------------------------------------------------------

    /// Parsed `git status --porcelain`, cached with a short TTL.
    pub async fn status(&self, repo_path: &Path) -> AppResult<StatusSummary> {
        let key = cache_key("status", repo_path);
        self.status_cache
            .get_or_fetch(&key, STATUS_TTL, || async {
                let output = self
                    .git
                    .execute(repo_path, &["status", "--porcelain"])
                    .await?
                    .into_result()?;
                Ok(parse_porcelain(&output))
            })
            .await
    }

    /// Paths with uncommitted changes (tracked and untracked), cached.
    pub async fn changed_files(&self, repo_path: &Path) -> AppResult<Vec<String>> {
        let key = cache_key("files", repo_path);
        self.files_cache
            .get_or_fetch(&key, FILES_TTL, || async {
                let status = self.status(repo_path).await?;
                Ok(status.files.into_iter().map(|f| f.path).collect())
            })
            .await
    }

    /// Ahead/behind relative to the upstream, cached. Reports zeros when no
    /// upstream is configured.
    pub async fn remote_state(&self, repo_path: &Path) -> AppResult<RemoteState> {
        let key = cache_key("remote", repo_path);
        self.remote_cache
            .get_or_fetch(&key, REMOTE_TTL, || async {
                let result = self
                    .git
                    .execute(
                        repo_path,
                        &["rev-list", "--left-right", "--count", "@{upstream}...HEAD"],
                    )
                    .await?;
                if !result.success {
                    return Ok(RemoteState::default());
                }
                let mut parts = result.stdout.split_whitespace();
                let behind = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
                let ahead = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
                Ok(RemoteState { ahead, behind })
            })
            .await
    }

    /// Build the generation inputs: focus files, a bounded diff excerpt, and
    /// the source fingerprint over (HEAD, porcelain status).
    pub async fn build_prompt_context(&self, repo_path: &Path) -> AppResult<PromptContext> {
        let porcelain = self
            .git
            .execute(repo_path, &["status", "--porcelain"])
            .await?
            .into_result()?;
        let status = parse_porcelain(&porcelain);
        let focus_files: Vec<String> = status.files.iter().map(|f| f.path.clone()).collect();

        let head = self.git.head_sha(repo_path).await?;
        let source_fingerprint = fingerprint(head.as_deref(), &porcelain);

        let prompt_context = if head.is_some() {
            let diff = self
                .git
                .execute(repo_path, &["diff", "HEAD"])
                .await?
                .into_result()?;
            let mut context = truncate_utf8(&diff, MAX_CONTEXT_BYTES).to_string();
            let untracked: Vec<&str> = status
                .files
                .iter()
                .filter(|f| f.is_untracked())
                .map(|f| f.path.as_str())
                .collect();
            if !untracked.is_empty() {
                context.push_str("\n\nUntracked files:\n");
                context.push_str(&untracked.join("\n"));
            }
            context
        } else {
            // Unborn repository: no HEAD to diff against
            format!("New files:\n{}", focus_files.join("\n"))
        };

        Ok(PromptContext {
            focus_files,
            prompt_context,
            source_fingerprint,
        })
    }

    // -----------------------------------------------------------------------
    // Queued mutations
    // -----------------------------------------------------------------------

    /// Stage specific files, serialized through the mutation queue.
    pub async fn stage_files(&self, repo_path: &Path, paths: Vec<String>) -> AppResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let repo = repo_path.to_path_buf();
        self.mutations
            .enqueue(move || async move {
                let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
                GitOps::new().add(&repo, &refs).await
            })
            .await?;
        self.invalidate(repo_path).await;
        Ok(())
    }

    /// Stage all changes.
    pub async fn stage_all(&self, repo_path: &Path) -> AppResult<()> {
        let repo = repo_path.to_path_buf();
        self.mutations
            .enqueue(move || async move {
                GitOps::new()
                    .execute(&repo, &["add", "-A"])
                    .await?
                    .into_result()?;
                Ok(())
            })
            .await?;
        self.invalidate(repo_path).await;
        Ok(())
    }

    /// Create a commit and return its sha.
    pub async fn commit(&self, repo_path: &Path, message: String) -> AppResult<String> {
        let repo = repo_path.to_path_buf();
        let sha = self
            .mutations
            .enqueue(move || async move { GitOps::new().commit(&repo, &message).await })
            .await?;
        self.invalidate(repo_path).await;
        Ok(sha)
    }

    /// Drop every cached read for a repository after a successful mutation.
    pub async fn invalidate(&self, repo_path: &Path) {
        self.status_cache
            .invalidate(&cache_key("status", repo_path))
            .await;
        self.files_cache
            .invalidate(&cache_key("files", repo_path))
            .await;
        self.remote_cache
            .invalidate(&cache_key("remote", repo_path))
            .await;
    }
}

fn cache_key(kind: &str, repo_path: &Path) -> String {
    format!("{}:{}", kind, repo_path.display())
}

fn fingerprint(head: Option<&str>, porcelain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(head.unwrap_or("").as_bytes());
    hasher.update([0]);
    hasher.update(porcelain.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
