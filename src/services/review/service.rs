//! Review Service
//!
//! Fan-out orchestration of the multi-specialist code review: every
//! specialist runs as its own task under its own timeout, settlements flow
//! back over a channel, and the orchestrator task alone merges results into
//! the session. Partial results survive individual specialist failures.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::events::SessionEvent;
use crate::models::finding::Finding;
use crate::models::session::{
    GateSession, ReviewResult, SessionFailure, SessionProgress, SessionResult, SessionSlot,
    SessionStatus,
};
use crate::services::git::GitService;
use crate::services::provider::{AgentProvider, SpecialistRequest};
use crate::services::session::{EventHub, RunSupervisor, SessionStore};
use crate::utils::error::{AppError, AppResult};
use crate::utils::timeout::{
    timeout_from_env, with_timeout, DEFAULT_REVIEW_TIMEOUT_SECS, REVIEW_TIMEOUT_ENV,
};

use super::merge::merge_findings;
use super::specialists::{normalize_findings, Specialist, SPECIALISTS};

/// One specialist's settlement, success or failure.
type Settlement = (Specialist, AppResult<Vec<Finding>>);

/// Orchestrates review generation sessions. Cheap to clone; clones share the
/// store, event hub, and caches.
#[derive(Clone)]
pub struct ReviewService {
    workspace_root: PathBuf,
    store: Arc<SessionStore>,
    events: Arc<EventHub>,
    supervisor: Arc<RunSupervisor>,
    git: Arc<GitService>,
    provider: Arc<dyn AgentProvider>,
    timeout: Duration,
}

impl ReviewService {
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
            timeout: timeout_from_env(REVIEW_TIMEOUT_ENV, DEFAULT_REVIEW_TIMEOUT_SECS),
        }
    }

    /// Override the per-specialist timeout (tests shrink this).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a queued review session and launch the fan-out in the
    /// background, preempting any still-running review run.
    pub async fn create_session(&self) -> AppResult<GateSession> {
        let session = GateSession::new(SessionSlot::Review);
        // The session must be queryable before it can be preempted: a
        // concurrent create finalizes the previous slot holder through the
        // store, so insert strictly before registering with the supervisor.
        self.store.insert(session.clone()).await;
        let token = self.supervisor.begin(SessionSlot::Review, &session.id).await;
        for evicted in self.store.sweep().await {
            self.events.teardown(&evicted).await;
        }

        let service = self.clone();
        let session_id = session.id.clone();
        tokio::spawn(async move {
            service.run(session_id, token).await;
        });
        Ok(session)
    }

    // -----------------------------------------------------------------------
    // Background run
    // -----------------------------------------------------------------------

    async fn run(&self, session_id: String, token: CancellationToken) {
        if let Err(err) = self.run_inner(&session_id, &token).await {
            self.fail(&session_id, &token, err).await;
        }
        self.supervisor
            .finish(SessionSlot::Review, &session_id)
            .await;
    }

    async fn run_inner(&self, session_id: &str, token: &CancellationToken) -> AppResult<()> {
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
            // Nothing to review; never fan out
            return Err(AppError::generation_failed(
                "no uncommitted changes to review",
                false,
            ));
        }

        let total = SPECIALISTS.len();
        let fingerprint = context.source_fingerprint.clone();
        if self
            .set_status(session_id, token, move |session| {
                session.source_fingerprint = fingerprint;
                session.status = SessionStatus::Running;
                session.result = Some(SessionResult::Review(ReviewResult::default()));
                session.progress = SessionProgress::new(
                    "reviewing",
                    20,
                    format!("Running {} review specialists", total),
                );
            })
            .await
            .is_none()
        {
            return Ok(());
        }

        let mut rx = self.spawn_specialists(
            session_id,
            &context.focus_files,
            context.prompt_context.clone(),
            token,
        );

        // Single-writer merge loop: settlements are folded into the session
        // here and nowhere else.
        let mut settled = 0usize;
        let mut succeeded = 0usize;
        let mut last_error: Option<AppError> = None;
        loop {
            let settlement = tokio::select! {
                _ = token.cancelled() => return Ok(()),
                settlement = rx.recv() => settlement,
            };
            let Some((specialist, result)) = settlement else {
                break;
            };
            settled += 1;
            let percent = progress_percent(settled, total);
            match result {
                Ok(findings) => {
                    succeeded += 1;
                    if self
                        .merge_settlement(session_id, token, specialist, findings.clone(), percent)
                        .await
                        .is_none()
                    {
                        return Ok(());
                    }
                    self.events
                        .publish(SessionEvent::ResultPartial {
                            session_id: session_id.to_string(),
                            agent: specialist.name.to_string(),
                            findings,
                        })
                        .await;
                }
                Err(err) => {
                    tracing::warn!(
                        "{} specialist failed for session {}: {}",
                        specialist.name,
                        session_id,
                        err
                    );
                    last_error = Some(err);
                    let name = specialist.name;
                    if self
                        .set_status(session_id, token, move |session| {
                            session.progress = SessionProgress::new(
                                "reviewing",
                                percent,
                                format!("{} specialist failed", name),
                            );
                        })
                        .await
                        .is_none()
                    {
                        return Ok(());
                    }
                }
            }
        }

        if succeeded == 0 {
            let detail = last_error
                .map(|err| err.to_string())
                .unwrap_or_else(|| "no specialist settled".to_string());
            return Err(AppError::AllProducersFailed(format!(
                "all {} review specialists failed ({})",
                total, detail
            )));
        }

        let finalized = self
            .set_status(session_id, token, move |session| {
                session.status = SessionStatus::Ready;
                let findings = session
                    .result
                    .as_ref()
                    .and_then(SessionResult::as_review)
                    .map(|r| r.findings.len())
                    .unwrap_or(0);
                session.progress = SessionProgress::new(
                    "complete",
                    100,
                    format!(
                        "Review complete: {} findings from {} of {} specialists",
                        findings, succeeded, total
                    ),
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

    /// Launch one task per specialist; each settles exactly once on the
    /// returned channel. Tasks abandon their call when the run is cancelled.
    fn spawn_specialists(
        &self,
        session_id: &str,
        focus_files: &[String],
        prompt_context: String,
        token: &CancellationToken,
    ) -> mpsc::Receiver<Settlement> {
        let (tx, rx) = mpsc::channel(SPECIALISTS.len());
        for specialist in SPECIALISTS {
            let tx = tx.clone();
            let provider = self.provider.clone();
            let token = token.clone();
            let timeout = self.timeout;
            let session_id = session_id.to_string();
            let request = SpecialistRequest {
                agent: specialist.name.to_string(),
                focus: specialist.focus.to_string(),
                focus_files: focus_files.to_vec(),
                prompt_context: prompt_context.clone(),
            };
            tokio::spawn(async move {
                let label = format!("{} review", specialist.name);
                let call = async {
                    let raw = with_timeout(&label, timeout, provider.run_specialist(request)).await?;
                    normalize_findings(&session_id, &specialist, &raw)
                };
                let result = tokio::select! {
                    _ = token.cancelled() => return,
                    result = call => result,
                };
                let _ = tx.send((specialist, result)).await;
            });
        }
        rx
    }

    /// Fold one successful settlement into the session result.
    async fn merge_settlement(
        &self,
        session_id: &str,
        token: &CancellationToken,
        specialist: Specialist,
        findings: Vec<Finding>,
        percent: u8,
    ) -> Option<GateSession> {
        self.set_status(session_id, token, move |session| {
            let mut result = match session.result.take() {
                Some(SessionResult::Review(result)) => result,
                _ => ReviewResult::default(),
            };
            result.findings = merge_findings(std::mem::take(&mut result.findings), findings);
            result.agents_completed.push(specialist.name.to_string());
            session.result = Some(SessionResult::Review(result));
            session.progress = SessionProgress::new(
                "reviewing",
                percent,
                format!("{} specialist complete", specialist.name),
            );
        })
        .await
    }

    /// Transition to a terminal failure, unless the run was cancelled.
    async fn fail(&self, session_id: &str, token: &CancellationToken, err: AppError) {
        tracing::warn!("review run for session {} failed: {}", session_id, err);
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
                session.progress = SessionProgress::new("finalizing", 100, "Review failed");
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
    /// run is cancelled or the session is terminal/evicted.
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

/// Review progress after `settled` of `total` specialists: ramps from 20 to
/// at most 90, leaving the last stretch for finalization.
fn progress_percent(settled: usize, total: usize) -> u8 {
    let ramp = (settled * 70 + total / 2) / total.max(1);
    ((20 + ramp).min(90)) as u8
}
