//! Shared helpers for the integration suite: throwaway git repositories and
//! a scripted provider implementing the public provider trait.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use commit_gate::models::session::GateSession;
use commit_gate::services::provider::{AgentProvider, QuizRequest, SpecialistRequest};
use commit_gate::{AppError, AppResult, AppState};

// ---------------------------------------------------------------------------
// Git repositories
// ---------------------------------------------------------------------------

pub fn run_git(dir: &Path, args: &[&str]) {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

pub fn clean_repo() -> TempDir {
    let temp = tempfile::tempdir().unwrap();
    run_git(temp.path(), &["init", "-q", "-b", "main"]);
    run_git(temp.path(), &["config", "user.email", "test@example.com"]);
    run_git(temp.path(), &["config", "user.name", "Test"]);
    std::fs::write(temp.path().join("base.txt"), "base\n").unwrap();
    run_git(temp.path(), &["add", "-A"]);
    run_git(
        temp.path(),
        &["commit", "-q", "--no-gpg-sign", "-m", "initial"],
    );
    temp
}

pub fn dirty_repo() -> TempDir {
    let temp = clean_repo();
    std::fs::write(temp.path().join("base.txt"), "base\nchanged\n").unwrap();
    temp
}

// ---------------------------------------------------------------------------
// Scripted provider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Scripted {
    Payload(Value),
    Failure { retryable: bool },
}

pub struct ScriptedProvider {
    quiz: Scripted,
    specialist_default: Scripted,
    specialist_overrides: HashMap<String, Scripted>,
    delay: Duration,
    quiz_calls: AtomicUsize,
    specialist_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(quiz: Scripted, specialist_default: Scripted) -> Self {
        Self {
            quiz,
            specialist_default,
            specialist_overrides: HashMap::new(),
            delay: Duration::ZERO,
            quiz_calls: AtomicUsize::new(0),
            specialist_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_specialist(mut self, agent: &str, response: Scripted) -> Self {
        self.specialist_overrides.insert(agent.to_string(), response);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn quiz_calls(&self) -> usize {
        self.quiz_calls.load(Ordering::SeqCst)
    }

    pub fn specialist_calls(&self) -> usize {
        self.specialist_calls.load(Ordering::SeqCst)
    }

    async fn resolve(&self, response: Scripted) -> AppResult<Value> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match response {
            Scripted::Payload(value) => Ok(value),
            Scripted::Failure { retryable } => Err(AppError::generation_failed(
                "scripted provider failure",
                retryable,
            )),
        }
    }
}

#[async_trait]
impl AgentProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate_quiz(&self, _request: QuizRequest) -> AppResult<Value> {
        self.quiz_calls.fetch_add(1, Ordering::SeqCst);
        self.resolve(self.quiz.clone()).await
    }

    async fn run_specialist(&self, request: SpecialistRequest) -> AppResult<Value> {
        self.specialist_calls.fetch_add(1, Ordering::SeqCst);
        let response = self
            .specialist_overrides
            .get(&request.agent)
            .cloned()
            .unwrap_or_else(|| self.specialist_default.clone());
        self.resolve(response).await
    }
}

// ---------------------------------------------------------------------------
// Payloads and state wiring
// ---------------------------------------------------------------------------

/// A well-formed quiz payload keyed entirely to choice 0.
pub fn quiz_payload(count: usize) -> Value {
    let questions: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "prompt": format!("What does change {} do?", i + 1),
                "choices": ["The right thing", "The wrong thing", "Nothing"],
                "answerIndex": 0,
                "explanation": "See the diff."
            })
        })
        .collect();
    json!({ "questions": questions })
}

pub fn finding_payload(title: &str, severity: &str) -> Value {
    json!({
        "findings": [{
            "title": title,
            "summary": format!("{} observed in the diff", title),
            "severity": severity,
            "path": "src/lib.rs",
            "lineStart": 10,
            "lineEnd": 12
        }]
    })
}

pub struct Harness {
    pub state: AppState,
    pub provider: Arc<ScriptedProvider>,
    pub repo: TempDir,
}

impl Harness {
    pub fn new(repo: TempDir, provider: ScriptedProvider) -> Self {
        let provider = Arc::new(provider);
        let state = AppState::new(repo.path().to_path_buf(), provider.clone());
        Self {
            state,
            provider,
            repo,
        }
    }
}

/// Poll a session until it reaches a terminal status.
pub async fn wait_terminal(state: &AppState, id: &str) -> GateSession {
    for _ in 0..300 {
        let session = state.get_session(id).await.unwrap();
        if session.status.is_terminal() {
            return session;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session {} never reached a terminal state", id);
}
