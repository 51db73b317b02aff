//! Event stream behavior observed through the public facade.

use std::time::Duration;

use commit_gate::models::events::SessionEvent;
use commit_gate::models::session::SessionStatus;

use crate::common::*;

/// Drain a subscription until its `Complete` marker.
async fn collect_until_complete(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<SessionEvent>,
) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event stream stalled before Complete")
            .expect("event stream closed before Complete");
        let done = event.is_complete();
        events.push(event);
        if done {
            return events;
        }
    }
}

#[tokio::test]
async fn review_stream_carries_partials_and_ends_with_complete() {
    let harness = Harness::new(
        dirty_repo(),
        ScriptedProvider::new(
            Scripted::Failure { retryable: false },
            Scripted::Payload(finding_payload("Issue", "high")),
        )
        .with_delay(Duration::from_millis(50)),
    );
    let state = &harness.state;

    let session = state.create_review_session().await.unwrap();
    let mut rx = state.subscribe(&session.id).await.unwrap();
    let events = collect_until_complete(&mut rx).await;

    // Replay first, Complete last, partials in between
    assert!(matches!(events.first(), Some(SessionEvent::Status { .. })));
    assert!(events.last().is_some_and(SessionEvent::is_complete));
    let partials = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::ResultPartial { .. }))
        .count();
    assert_eq!(partials, 4);

    // Progress never regresses
    let mut last_percent = 0;
    for event in &events {
        if let SessionEvent::Status { progress, .. } = event {
            assert!(progress.percent >= last_percent);
            last_percent = progress.percent;
        }
    }

    // The stream is closed after Complete
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn failed_run_streams_error_then_complete() {
    let harness = Harness::new(
        dirty_repo(),
        ScriptedProvider::new(
            Scripted::Failure { retryable: true },
            Scripted::Failure { retryable: false },
        )
        .with_delay(Duration::from_millis(50)),
    );
    let state = &harness.state;

    let session = state.create_quiz_session(4).await.unwrap();
    let mut rx = state.subscribe(&session.id).await.unwrap();
    let events = collect_until_complete(&mut rx).await;

    let error_position = events
        .iter()
        .position(|e| matches!(e, SessionEvent::Error { .. }))
        .expect("failed run must stream an Error event");
    assert_eq!(error_position, events.len() - 2);
    if let SessionEvent::Error { retryable, .. } = &events[error_position] {
        assert!(retryable);
    }
    if let Some(SessionEvent::Complete { status, .. }) = events.last() {
        assert_eq!(*status, SessionStatus::Failed);
    }
}

#[tokio::test]
async fn late_subscriber_gets_terminal_replay() {
    let harness = Harness::new(
        dirty_repo(),
        ScriptedProvider::new(
            Scripted::Payload(quiz_payload(1)),
            Scripted::Failure { retryable: false },
        ),
    );
    let state = &harness.state;

    let session = state.create_quiz_session(1).await.unwrap();
    wait_terminal(state, &session.id).await;

    let mut rx = state.subscribe(&session.id).await.unwrap();
    let events = collect_until_complete(&mut rx).await;
    assert_eq!(events.len(), 2);
    assert!(matches!(
        events[0],
        SessionEvent::Status {
            status: SessionStatus::Ready,
            ..
        }
    ));
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn new_subscription_replaces_the_previous_one() {
    let harness = Harness::new(
        dirty_repo(),
        ScriptedProvider::new(
            Scripted::Payload(quiz_payload(1)),
            Scripted::Failure { retryable: false },
        )
        .with_delay(Duration::from_millis(150)),
    );
    let state = &harness.state;

    let session = state.create_quiz_session(1).await.unwrap();
    let mut first = state.subscribe(&session.id).await.unwrap();
    let mut second = state.subscribe(&session.id).await.unwrap();

    let events = collect_until_complete(&mut second).await;
    assert!(events.last().is_some_and(SessionEvent::is_complete));

    // The replaced stream got at most its replay before closing
    first.close();
}
