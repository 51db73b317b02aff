//! Quiz Service
//!
//! Single-producer orchestration of the commit readiness quiz: one provider
//! call under a timeout, then local grading and fingerprint-checked
//! validation of the result.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::models::events::SessionEvent;
use crate::models::quiz::QuizGrade;
use crate::models::session::{
    GateSession, QuizResult, SessionFailure, SessionProgress, SessionResult, SessionSlot,
    SessionStatus,
};
use crate::services::git::GitService;
use crate::services::provider::{AgentProvider, QuizRequest};
use crate::services::session::{EventHub, RunSupervisor, SessionStore};
use crate::utils::error::{AppError, AppResult};
use crate::utils::timeout::{
    timeout_from_env, with_timeout, DEFAULT_QUIZ_TIMEOUT_SECS, QUIZ_TIMEOUT_ENV,
};

use super::generator::normalize_quiz_payload;

/// Largest accepted questionCount in a creation request.
const MAX_QUESTIONS: u8 = 20;

/// Orchestrates quiz generation sessions. Cheap to clone; clones share the
/// store, event hub, and caches.
#[derive(Clone)]
pub struct QuizService {
    workspace_root: PathBuf,
    store: Arc<SessionStore>,
    events: Arc<EventHub>,
    supervisor: Arc<RunSupervisor>,
    git: Arc<GitService>,
    provider: Arc<dyn AgentProvider>,
    timeout: Duration,
}

impl QuizService {
    pub fn new(
        workspace_root: PathBuf,
        store: Arc<SessionStore>,
        events: Arc<EventHub>,
        supervisor: Arc<RunSupervisor>,
        git: Arc<GitService>,
        provider: Arc<dyn AgentProvider>,
    ) -> Self {
        Self {
            workspace_root,
            store,
            events,
            supervisor,
            git,
            provider,
            timeout: timeout_from_env(QUIZ_TIMEOUT_ENV, DEFAULT_QUIZ_TIMEOUT_SECS),
        }
    }

    /// Override the generation timeout (tests shrink this).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a queued quiz session and launch generation in the background.
    ///
    /// Always synchronous-fast: any still-running quiz run is preempted
    /// before the new session is inserted.
    pub async fn create_session(&self, question_count: u8) -> AppResult<GateSession> {
        if question_count == 0 || question_count > MAX_QUESTIONS {
            return Err(AppError::invalid_request(format!(
                "questionCount must be between 1 and {}",
                MAX_QUESTIONS
            )));
        }

        let session = GateSession::new(SessionSlot::Quiz);
        // The session must be queryable before it can be preempted: a
        // concurrent create finalizes the previous slot holder through the
        // store, so insert strictly before registering with the supervisor.
        self.store.insert(session.clone()).await;
        let token = self.supervisor.begin(SessionSlot::Quiz, &session.id).await;
        for evicted in self.store.sweep().await {
            self.events.teardown(&evicted).await;
        }

        let service = self.clone();
        let session_id = session.id.clone();
        tokio::spawn(async move {
            service.run(session_id, question_count, token).await;
        });
        Ok(session)
    }

    /// Grade a submitted answer sheet against the generated answer key.
    pub async fn submit_answers(&self, id: &str, answers: &[u32]) -> AppResult<QuizGrade> {
        let session = self.store.get(id).await?;
        if session.slot != SessionSlot::Quiz {
            return Err(AppError::invalid_request("not a quiz session"));
        }
        match session.status {
            SessionStatus::Queued | SessionStatus::Running => {
                return Err(AppError::not_ready("quiz generation has not completed"));
            }
            SessionStatus::Failed | SessionStatus::Cancelled => {
                return Err(AppError::state_conflict(
                    "quiz generation did not complete successfully",
                ));
            }
            SessionStatus::Validated => {
                return Err(AppError::state_conflict("quiz already validated"));
            }
            SessionStatus::Ready => {}
        }

        let quiz = session
            .result
            .as_ref()
            .and_then(SessionResult::as_quiz)
            .map(|r| r.quiz.clone())
            .ok_or_else(|| AppError::internal("ready quiz session has no quiz payload"))?;

        if answers.len() != quiz.questions.len() {
            return Err(AppError::invalid_request(format!(
                "expected {} answers, got {}",
                quiz.questions.len(),
                answers.len()
            )));
        }
        for (answer, question) in answers.iter().zip(&quiz.questions) {
            if *answer as usize >= question.choices.len() {
                return Err(AppError::invalid_request(format!(
                    "answer {} out of range for question {}",
                    answer, question.id
                )));
            }
        }

        let grade = QuizGrade::grade(&quiz, answers);
        let stored = grade.clone();
        self.store
            .update(id, move |session| {
                if let Some(SessionResult::Quiz(result)) = session.result.as_mut() {
                    result.grade = Some(stored);
                }
            })
            .await?;
        Ok(grade)
    }

    /// Mark a passed quiz as validated, rejecting stale fingerprints.
    ///
    /// A fingerprint mismatch means the repository changed since the quiz was
    /// generated; the session is left unchanged.
    pub async fn validate(&self, id: &str, fingerprint: &str) -> AppResult<GateSession> {
        let session = self.store.get(id).await?;
        if session.slot != SessionSlot::Quiz {
            return Err(AppError::invalid_request("not a quiz session"));
        }
        match session.status {
            SessionStatus::Queued | SessionStatus::Running => {
                return Err(AppError::not_ready("quiz generation has not completed"));
            }
            SessionStatus::Failed | SessionStatus::Cancelled => {
                return Err(AppError::state_conflict(
                    "quiz generation did not complete successfully",
                ));
            }
            SessionStatus::Validated => {
                return Err(AppError::state_conflict("quiz already validated"));
            }
            SessionStatus::Ready => {}
        }

        let grade = session
            .result
            .as_ref()
            .and_then(SessionResult::as_quiz)
            .and_then(|r| r.grade.as_ref())
            .ok_or_else(|| AppError::not_ready("answers have not been submitted"))?;
        if !grade.passed {
            return Err(AppError::state_conflict(format!(
                "quiz score {}% is below the pass threshold",
                grade.score_percent
            )));
        }
        if fingerprint != session.source_fingerprint {
            return Err(AppError::state_conflict(
                "repository changed since quiz generation",
            ));
        }

        self.store
            .update(id, |session| {
                session.status = SessionStatus::Validated;
            })
            .await
    }

    // -----------------------------------------------------------------------
    // Background run
    // -----------------------------------------------------------------------

    async fn run(&self, session_id: String, question_count: u8, token: CancellationToken) {
        if let Err(err) = self.run_inner(&session_id, question_count, &token).await {
            self.fail(&session_id, &token, err).await;
        }
        self.supervisor.finish(SessionSlot::Quiz, &session_id).await;
    }

    async fn run_inner(
        &self,
        session_id: &str,
        question_count: u8,
        token: &CancellationToken,
    ) -> AppResult<()> {
        if self
            .set_status(session_id, token, |session| {
                session.status = SessionStatus::Running;
                session.progress =
                    SessionProgress::new("context", 10, "Inspecting uncommitted changes");
            })
            .await
            .is_none()
        {
            return Ok(());
        }

        let context = tokio::select! {
            _ = token.cancelled() => return Ok(()),
            context = self.git.build_prompt_context(&self.workspace_root) => context?,
        };

        if context.focus_files.is_empty() {
            // Nothing to quiz on; never invoke the provider
            return Err(AppError::generation_failed(
                "no uncommitted changes to generate a quiz from",
                false,
            ));
        }

        let fingerprint = context.source_fingerprint.clone();
        if self
            .set_status(session_id, token, move |session| {
                session.source_fingerprint = fingerprint;
                session.status = SessionStatus::Running;
                session.progress = SessionProgress::new("generating", 30, "Generating quiz");
            })
            .await
            .is_none()
        {
            return Ok(());
        }

        let request = QuizRequest {
            focus_files: context.focus_files.clone(),
            prompt_context: context.prompt_context,
            question_count,
        };
        let raw = tokio::select! {
            _ = token.cancelled() => return Ok(()),
            raw = with_timeout("quiz generation", self.timeout, self.provider.generate_quiz(request)) => raw?,
        };

        let quiz = normalize_quiz_payload(&raw, context.focus_files)?;
        let question_total = quiz.questions.len();

        let finalized = self
            .set_status(session_id, token, move |session| {
                session.status = SessionStatus::Ready;
                session.result = Some(SessionResult::Quiz(QuizResult { quiz, grade: None }));
                session.progress = SessionProgress::new(
                    "complete",
                    100,
                    format!("Quiz ready with {} questions", question_total),
                );
            })
            .await;
        if finalized.is_some() {
            self.events
                .publish(SessionEvent::Complete {
                    session_id: session_id.to_string(),
                    status: SessionStatus::Ready,
                })
                .await;
        }
        Ok(())
    }

    /// Transition to a terminal failure, unless the run was cancelled.
    async fn fail(&self, session_id: &str, token: &CancellationToken, err: AppError) {
        tracing::warn!("quiz run for session {} failed: {}", session_id, err);
        let failure = SessionFailure {
            code: err.code().to_string(),
            message: err.to_string(),
            retryable: err.retryable(),
        };
        let stored = failure.clone();
        let finalized = self
            .set_status(session_id, token, move |session| {
                session.status = SessionStatus::Failed;
                session.failure = Some(stored);
                session.progress = SessionProgress::new("finalizing", 100, "Generation failed");
            })
            .await;
        if finalized.is_some() {
            self.events
                .publish(SessionEvent::Error {
                    session_id: session_id.to_string(),
                    code: err.code().to_string(),
                    message: failure.message,
                    retryable: failure.retryable,
                })
                .await;
            self.events
                .publish(SessionEvent::Complete {
                    session_id: session_id.to_string(),
                    status: SessionStatus::Failed,
                })
                .await;
        }
    }

    /// Guarded session mutation plus status event. Returns `None` once the
    /// run is cancelled or the session is terminal/evicted; the orchestrator
    /// must stop mutating at that point.
    async fn set_status<F>(
        &self,
        session_id: &str,
        token: &CancellationToken,
        f: F,
    ) -> Option<GateSession>
    where
        F: FnOnce(&mut GateSession),
    {
        if token.is_cancelled() {
            return None;
        }
        let session = self.store.update_active(session_id, f).await?;
        self.events
            .publish(SessionEvent::Status {
                session_id: session.id.clone(),
                status: session.status,
                progress: session.progress.clone(),
            })
            .await;
        Some(session)
    }
}
