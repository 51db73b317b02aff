//! Test Support
//!
//! Shared fixtures for orchestration tests: a scripted provider double,
//! throwaway git repositories, and wired-up service stacks.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::models::session::GateSession;
use crate::services::git::GitService;
use crate::services::provider::{AgentProvider, QuizRequest, SpecialistRequest};
use crate::services::quiz::QuizService;
use crate::services::review::ReviewService;
use crate::services::session::{EventHub, RunSupervisor, SessionStore};
use crate::utils::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// Scripted provider
// ---------------------------------------------------------------------------

/// What a scripted call should do.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Resolve with this payload.
    Payload(Value),
    /// Fail with a `GenerationFailed` of the given retryability.
    Failure { retryable: bool },
    /// Never resolve (exercises the caller's timeout).
    Hang,
}

/// Provider double that replays scripted responses and counts calls.
pub struct ScriptedProvider {
    quiz: ScriptedResponse,
    specialist_default: ScriptedResponse,
    specialist_overrides: HashMap<String, ScriptedResponse>,
    delay: Duration,
    quiz_calls: AtomicUsize,
    specialist_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(quiz: ScriptedResponse, specialist_default: ScriptedResponse) -> Self {
        Self {
            quiz,
            specialist_default,
            specialist_overrides: HashMap::new(),
            delay: Duration::ZERO,
            quiz_calls: AtomicUsize::new(0),
            specialist_calls: AtomicUsize::new(0),
        }
    }

    /// Script a response for one named specialist.
    pub fn with_specialist(mut self, agent: &str, response: ScriptedResponse) -> Self {
        self.specialist_overrides.insert(agent.to_string(), response);
        self
    }

    /// Delay every call, to give tests a window to preempt or cancel.
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

    async fn resolve(&self, response: ScriptedResponse) -> AppResult<Value> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match response {
            ScriptedResponse::Payload(value) => Ok(value),
            ScriptedResponse::Failure { retryable } => Err(AppError::generation_failed(
                "scripted provider failure",
                retryable,
            )),
            ScriptedResponse::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(AppError::internal("scripted hang resolved"))
            }
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
// Scripted payloads
// ---------------------------------------------------------------------------

/// A well-formed quiz payload with `count` questions, all keyed to choice 0.
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

/// A well-formed specialist payload with one finding.
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

// ---------------------------------------------------------------------------
// Git repositories
// ---------------------------------------------------------------------------

fn run_git(dir: &Path, args: &[&str]) {
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

/// A repo with one commit and no uncommitted changes.
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

/// A repo with one commit plus an uncommitted modification.
pub fn dirty_repo() -> TempDir {
    let temp = clean_repo();
    std::fs::write(temp.path().join("base.txt"), "base\nchanged\n").unwrap();
    temp
}

// ---------------------------------------------------------------------------
// Wired service stacks
// ---------------------------------------------------------------------------

/// Poll a session until it reaches a terminal status.
pub async fn wait_terminal(store: &SessionStore, id: &str) -> GateSession {
    for _ in 0..300 {
        let session = store.get(id).await.unwrap();
        if session.status.is_terminal() {
            return session;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session {} never reached a terminal state", id);
}

pub struct QuizFixture {
    pub service: Arc<QuizService>,
    pub store: Arc<SessionStore>,
    pub events: Arc<EventHub>,
    pub supervisor: Arc<RunSupervisor>,
    pub provider: Arc<ScriptedProvider>,
    _repo: TempDir,
}

impl QuizFixture {
    async fn build(repo: TempDir, provider: ScriptedProvider, timeout: Duration) -> Self {
        let store = Arc::new(SessionStore::new());
        let events = Arc::new(EventHub::new());
        let supervisor = Arc::new(RunSupervisor::new(store.clone(), events.clone()));
        let provider = Arc::new(provider);
        let service = Arc::new(
            QuizService::new(
                repo.path().to_path_buf(),
                store.clone(),
                events.clone(),
                supervisor.clone(),
                Arc::new(GitService::new()),
                provider.clone(),
            )
            .with_timeout(timeout),
        );
        Self {
            service,
            store,
            events,
            supervisor,
            provider,
            _repo: repo,
        }
    }

    pub async fn with_payload(payload: Value) -> Self {
        Self::build(
            dirty_repo(),
            ScriptedProvider::new(
                ScriptedResponse::Payload(payload),
                ScriptedResponse::Failure { retryable: false },
            ),
            Duration::from_secs(5),
        )
        .await
    }

    pub async fn with_clean_tree(payload: Value) -> Self {
        Self::build(
            clean_repo(),
            ScriptedProvider::new(
                ScriptedResponse::Payload(payload),
                ScriptedResponse::Failure { retryable: false },
            ),
            Duration::from_secs(5),
        )
        .await
    }

    pub async fn failing(retryable: bool) -> Self {
        Self::build(
            dirty_repo(),
            ScriptedProvider::new(
                ScriptedResponse::Failure { retryable },
                ScriptedResponse::Failure { retryable },
            ),
            Duration::from_secs(5),
        )
        .await
    }

    pub async fn hanging() -> Self {
        Self::build(
            dirty_repo(),
            ScriptedProvider::new(ScriptedResponse::Hang, ScriptedResponse::Hang),
            Duration::from_millis(150),
        )
        .await
    }

    pub async fn slow(payload: Value) -> Self {
        Self::build(
            dirty_repo(),
            ScriptedProvider::new(
                ScriptedResponse::Payload(payload),
                ScriptedResponse::Failure { retryable: false },
            )
            .with_delay(Duration::from_millis(200)),
            Duration::from_secs(5),
        )
        .await
    }
}

pub struct ReviewFixture {
    pub service: Arc<ReviewService>,
    pub store: Arc<SessionStore>,
    pub events: Arc<EventHub>,
    pub supervisor: Arc<RunSupervisor>,
    pub provider: Arc<ScriptedProvider>,
    _repo: TempDir,
}

impl ReviewFixture {
    pub async fn build(repo: TempDir, provider: ScriptedProvider, timeout: Duration) -> Self {
        let store = Arc::new(SessionStore::new());
        let events = Arc::new(EventHub::new());
        let supervisor = Arc::new(RunSupervisor::new(store.clone(), events.clone()));
        let provider = Arc::new(provider);
        let service = Arc::new(
            ReviewService::new(
                repo.path().to_path_buf(),
                store.clone(),
                events.clone(),
                supervisor.clone(),
                Arc::new(GitService::new()),
                provider.clone(),
            )
            .with_timeout(timeout),
        );
        Self {
            service,
            store,
            events,
            supervisor,
            provider,
            _repo: repo,
        }
    }

    pub async fn with_default(response: ScriptedResponse) -> Self {
        Self::build(
            dirty_repo(),
            ScriptedProvider::new(ScriptedResponse::Failure { retryable: false }, response),
            Duration::from_secs(5),
        )
        .await
    }
}
