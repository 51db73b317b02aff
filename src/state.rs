//! Application State
//!
//! The single facade the outer surface (CLI, IPC, or HTTP layer) talks to.
//! Owns the shared session store, event hub, and supervisor, and wires the
//! quiz and review services against one workspace and one provider.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::models::events::SessionEvent;
use crate::models::quiz::QuizGrade;
use crate::models::session::GateSession;
use crate::services::git::{GitService, RemoteState, StatusSummary};
use crate::services::provider::AgentProvider;
use crate::services::quiz::QuizService;
use crate::services::review::ReviewService;
use crate::services::session::{EventHub, RunSupervisor, SessionStore};
use crate::utils::error::AppResult;

/// Shared application state.
pub struct AppState {
    workspace_root: PathBuf,
    store: Arc<SessionStore>,
    events: Arc<EventHub>,
    supervisor: Arc<RunSupervisor>,
    git: Arc<GitService>,
    quiz: Arc<QuizService>,
    review: Arc<ReviewService>,
}

impl AppState {
    /// Wire up the full service stack for one workspace.
    pub fn new(workspace_root: PathBuf, provider: Arc<dyn AgentProvider>) -> Self {
        let store = Arc::new(SessionStore::new());
        let events = Arc::new(EventHub::new());
        let supervisor = Arc::new(RunSupervisor::new(store.clone(), events.clone()));
        let git = Arc::new(GitService::new());
        let quiz = Arc::new(QuizService::new(
            workspace_root.clone(),
            store.clone(),
            events.clone(),
            supervisor.clone(),
            git.clone(),
            provider.clone(),
        ));
        let review = Arc::new(ReviewService::new(
            workspace_root.clone(),
            store.clone(),
            events.clone(),
            supervisor.clone(),
            git.clone(),
            provider,
        ));
        Self {
            workspace_root,
            store,
            events,
            supervisor,
            git,
            quiz,
            review,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// Start a quiz generation session.
    pub async fn create_quiz_session(&self, question_count: u8) -> AppResult<GateSession> {
        self.quiz.create_session(question_count).await
    }

    /// Start a review generation session.
    pub async fn create_review_session(&self) -> AppResult<GateSession> {
        self.review.create_session().await
    }

    /// Snapshot a session by id.
    pub async fn get_session(&self, id: &str) -> AppResult<GateSession> {
        self.store.get(id).await
    }

    /// Subscribe to a session's event stream.
    ///
    /// Replays the current state first; for terminal sessions the stream
    /// closes right after the replay. A new subscription replaces any
    /// previous one for the same session.
    pub async fn subscribe(&self, id: &str) -> AppResult<mpsc::UnboundedReceiver<SessionEvent>> {
        let session = self.store.get(id).await?;
        Ok(self.events.subscribe(&session).await)
    }

    /// Grade submitted quiz answers.
    pub async fn submit_answers(&self, id: &str, answers: &[u32]) -> AppResult<QuizGrade> {
        self.quiz.submit_answers(id, answers).await
    }

    /// Validate a passed quiz against the current repository fingerprint.
    pub async fn validate_session(&self, id: &str, fingerprint: &str) -> AppResult<GateSession> {
        self.quiz.validate(id, fingerprint).await
    }

    /// Cancel a live session. Returns whether a run was actually cancelled;
    /// cancelling an already-terminal session is a no-op.
    pub async fn cancel_session(&self, id: &str) -> AppResult<bool> {
        // Unknown ids are an error, finished ones are not
        self.store.get(id).await?;
        Ok(self.supervisor.cancel_session(id).await)
    }

    // -----------------------------------------------------------------------
    // Repository
    // -----------------------------------------------------------------------

    /// Cached working-tree status.
    pub async fn repo_status(&self) -> AppResult<StatusSummary> {
        self.git.status(&self.workspace_root).await
    }

    /// Cached ahead/behind counts against the upstream.
    pub async fn remote_state(&self) -> AppResult<RemoteState> {
        self.git.remote_state(&self.workspace_root).await
    }

    /// Stage specific files.
    pub async fn stage_files(&self, paths: Vec<String>) -> AppResult<()> {
        self.git.stage_files(&self.workspace_root, paths).await
    }

    /// Stage everything.
    pub async fn stage_all(&self) -> AppResult<()> {
        self.git.stage_all(&self.workspace_root).await
    }

    /// Create a commit and return its sha.
    pub async fn commit(&self, message: String) -> AppResult<String> {
        self.git.commit(&self.workspace_root, message).await
    }
}
