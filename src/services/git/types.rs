//! Git Data Types
//!
//! Parsed structures handed to the orchestration layer, plus the porcelain
//! status parser they come from.

use serde::{Deserialize, Serialize};

/// Repository working mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoMode {
    Normal,
    Detached,
    Merging,
}

/// Resolved repository context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitContext {
    /// Absolute repository root
    pub repo_root: String,
    /// Current branch name ("HEAD" when detached)
    pub branch: String,
    /// Working mode
    pub mode: RepoMode,
}

/// One changed path from `git status --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedFile {
    /// Repository-relative path
    pub path: String,
    /// Index (staged) status letter
    pub index_status: char,
    /// Working-tree status letter
    pub worktree_status: char,
}

impl ChangedFile {
    pub fn is_staged(&self) -> bool {
        self.index_status != ' ' && self.index_status != '?'
    }

    pub fn is_untracked(&self) -> bool {
        self.index_status == '?' && self.worktree_status == '?'
    }
}

/// Parsed repository status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    /// All changed entries in porcelain order
    pub files: Vec<ChangedFile>,
}

impl StatusSummary {
    pub fn is_clean(&self) -> bool {
        self.files.is_empty()
    }

    pub fn staged_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_staged()).count()
    }
}

/// Ahead/behind relative to the upstream branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteState {
    pub ahead: u32,
    pub behind: u32,
}

/// Inputs for a generation run, derived from the working tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptContext {
    /// Changed files the generation focuses on
    pub focus_files: Vec<String>,
    /// Bounded diff excerpt handed to the provider
    pub prompt_context: String,
    /// Opaque snapshot token of the repository state
    pub source_fingerprint: String,
}

/// Parse `git status --porcelain` (v1) output.
pub fn parse_porcelain(output: &str) -> StatusSummary {
    let mut files = Vec::new();
    for line in output.lines() {
        if line.len() < 4 {
            continue;
        }
        let mut chars = line.chars();
        let index_status = chars.next().unwrap_or(' ');
        let worktree_status = chars.next().unwrap_or(' ');
        let rest = &line[3..];
        // Renames are reported as "old -> new"; keep the new path
        let path = rest
            .split(" -> ")
            .last()
            .unwrap_or(rest)
            .trim_matches('"')
            .to_string();
        files.push(ChangedFile {
            path,
            index_status,
            worktree_status,
        });
    }
    StatusSummary { files }
}
