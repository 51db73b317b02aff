//! End-to-end quiz gate flow through the public [`AppState`] facade.

use commit_gate::models::session::{SessionResult, SessionStatus};
use commit_gate::AppError;

use crate::common::*;

#[tokio::test]
async fn quiz_gate_passes_and_unlocks_commit() {
    let harness = Harness::new(
        dirty_repo(),
        ScriptedProvider::new(
            Scripted::Payload(quiz_payload(4)),
            Scripted::Failure { retryable: false },
        ),
    );
    let state = &harness.state;

    let session = state.create_quiz_session(4).await.unwrap();
    assert_eq!(session.status, SessionStatus::Queued);

    let ready = wait_terminal(state, &session.id).await;
    assert_eq!(ready.status, SessionStatus::Ready);
    let quiz_len = match ready.result.as_ref().and_then(SessionResult::as_quiz) {
        Some(result) => result.quiz.questions.len(),
        None => panic!("ready quiz session without quiz payload"),
    };
    assert_eq!(quiz_len, 4);

    // The scripted answer key is all zeros
    let grade = state.submit_answers(&session.id, &[0, 0, 0, 0]).await.unwrap();
    assert!(grade.passed);
    assert_eq!(grade.score_percent, 100);

    let validated = state
        .validate_session(&session.id, &ready.source_fingerprint)
        .await
        .unwrap();
    assert_eq!(validated.status, SessionStatus::Validated);

    // The gate is open; stage and commit through the same facade
    state.stage_all().await.unwrap();
    let sha = state.commit("apply reviewed change".to_string()).await.unwrap();
    assert_eq!(sha.len(), 40);
    assert!(state.repo_status().await.unwrap().is_clean());
}

#[tokio::test]
async fn quiz_validation_rejects_changed_repository() {
    let harness = Harness::new(
        dirty_repo(),
        ScriptedProvider::new(
            Scripted::Payload(quiz_payload(2)),
            Scripted::Failure { retryable: false },
        ),
    );
    let state = &harness.state;

    let session = state.create_quiz_session(2).await.unwrap();
    let ready = wait_terminal(state, &session.id).await;
    state.submit_answers(&session.id, &[0, 0]).await.unwrap();

    // The working tree changes after generation; the stale fingerprint the
    // client still holds must not validate
    std::fs::write(harness.repo.path().join("base.txt"), "late edit\n").unwrap();
    let err = state
        .validate_session(&session.id, "0000000000000000")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StateConflict(_)));

    let unchanged = state.get_session(&session.id).await.unwrap();
    assert_eq!(unchanged.status, SessionStatus::Ready);
}

#[tokio::test]
async fn failing_quiz_blocks_validation() {
    let harness = Harness::new(
        dirty_repo(),
        ScriptedProvider::new(
            Scripted::Payload(quiz_payload(4)),
            Scripted::Failure { retryable: false },
        ),
    );
    let state = &harness.state;

    let session = state.create_quiz_session(4).await.unwrap();
    let ready = wait_terminal(state, &session.id).await;

    let grade = state.submit_answers(&session.id, &[1, 1, 1, 0]).await.unwrap();
    assert!(!grade.passed);
    assert_eq!(grade.score_percent, 25);

    let err = state
        .validate_session(&session.id, &ready.source_fingerprint)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StateConflict(_)));
}

#[tokio::test]
async fn clean_tree_fails_fast_without_provider_call() {
    let harness = Harness::new(
        clean_repo(),
        ScriptedProvider::new(
            Scripted::Payload(quiz_payload(4)),
            Scripted::Failure { retryable: false },
        ),
    );
    let state = &harness.state;

    let session = state.create_quiz_session(4).await.unwrap();
    let done = wait_terminal(state, &session.id).await;
    assert_eq!(done.status, SessionStatus::Failed);
    assert!(!done.failure.unwrap().retryable);
    assert_eq!(harness.provider.quiz_calls(), 0);
}
