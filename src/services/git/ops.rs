//! Git Operations
//!
//! Safe async wrapper around git CLI invocations. Shell-outs run through
//! `tokio::process` so every git call is a suspension point for the
//! orchestration layer above.

use std::path::Path;

use tokio::process::Command;

use crate::utils::error::{AppError, AppResult};

/// Result of a git command execution
#[derive(Debug)]
pub struct GitResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl GitResult {
    /// Check if the command was successful and return stdout or error
    pub fn into_result(self) -> AppResult<String> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(AppError::command(format!(
                "Git command failed (exit {}): {}",
                self.exit_code,
                self.stderr.trim()
            )))
        }
    }
}

/// Safe git operations wrapper
#[derive(Debug, Default)]
pub struct GitOps;

impl GitOps {
    /// Create a new GitOps instance
    pub fn new() -> Self {
        Self
    }

    /// Execute a git command in the specified directory
    pub async fn execute(&self, cwd: &Path, args: &[&str]) -> AppResult<GitResult> {
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            // Disable interactive prompts to avoid hanging automation flows/tests.
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GCM_INTERACTIVE", "never")
            .output()
            .await
            .map_err(|e| AppError::command(format!("Failed to execute git: {}", e)))?;

        Ok(GitResult {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Get the repository root directory
    pub async fn repo_root(&self, cwd: &Path) -> AppResult<String> {
        self.execute(cwd, &["rev-parse", "--show-toplevel"])
            .await?
            .into_result()
            .map(|s| s.trim().to_string())
    }

    /// Get the current branch name ("HEAD" when detached)
    pub async fn current_branch(&self, cwd: &Path) -> AppResult<String> {
        self.execute(cwd, &["rev-parse", "--abbrev-ref", "HEAD"])
            .await?
            .into_result()
            .map(|s| s.trim().to_string())
    }

    /// Get the HEAD commit sha, or None in an unborn repository
    pub async fn head_sha(&self, cwd: &Path) -> AppResult<Option<String>> {
        let result = self
            .execute(cwd, &["rev-parse", "-q", "--verify", "HEAD"])
            .await?;
        if result.success {
            Ok(Some(result.stdout.trim().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Check whether a merge is currently in progress
    pub async fn merge_in_progress(&self, cwd: &Path) -> AppResult<bool> {
        let result = self
            .execute(cwd, &["rev-parse", "-q", "--verify", "MERGE_HEAD"])
            .await?;
        Ok(result.success)
    }

    /// Stage specific paths
    pub async fn add(&self, cwd: &Path, paths: &[&str]) -> AppResult<()> {
        let mut args = vec!["add", "--"];
        args.extend_from_slice(paths);
        self.execute(cwd, &args).await?.into_result()?;
        Ok(())
    }

    /// Create a commit and return its sha
    pub async fn commit(&self, cwd: &Path, message: &str) -> AppResult<String> {
        self.execute(cwd, &["commit", "--no-gpg-sign", "-m", message])
            .await?
            .into_result()?;
        self.execute(cwd, &["rev-parse", "HEAD"])
            .await?
            .into_result()
            .map(|s| s.trim().to_string())
    }
}
