//! Progression through the controller: gating, commits, and blocking.

mod common;

use common::*;
use fb_core::{Choice, Segment, SessionId};
use fb_reader::{
    BlockReason, ControllerError, Extension, ExtensionError, GateError, GateState, Navigation,
    Progress, ProgressionController, ReaderConfig, SessionStore, StoryAction,
};

fn sid() -> SessionId {
    SessionId::new("s1")
}

fn choice_a() -> Choice {
    ab_choices()[0].clone()
}

fn segments(c: &ProgressionController<ScriptedBackend>) -> usize {
    c.store().borrow().get_session(&sid()).unwrap().len()
}

/// Answer all three of `three_questions()` with the given picks and submit.
fn answer_and_submit(
    c: &ProgressionController<ScriptedBackend>,
    picks: [usize; 3],
) -> fb_reader::Submission {
    for (q, opt) in picks.into_iter().enumerate() {
        c.answer(&sid(), q, opt).unwrap();
    }
    c.submit(&sid()).unwrap()
}

#[tokio::test]
async fn choice_without_questions_extends_story() {
    let backend = ScriptedBackend::new();
    backend.reply(Ok(next_segment(2)));
    let c = controller_with(opening(), backend).await;

    let progress = c.request_choice(&sid(), 0, &choice_a()).await.unwrap();
    assert_eq!(
        progress,
        Progress::Advanced {
            index: 1,
            completed: false
        }
    );
    assert_eq!(segments(&c), 2);
    assert_eq!(c.position(&sid()).unwrap(), 1);

    let requests = c.backend().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].action,
        StoryAction::Choose {
            description: "Follow the fox".into()
        }
    );
    assert_eq!(requests[0].metadata.age, Some(6));

    let store = c.store().borrow();
    let session = store.get_session(&sid()).unwrap();
    assert_eq!(
        session.segments[1].choice_made.as_deref(),
        Some("Follow the fox")
    );
}

#[tokio::test]
async fn conclusion_flag_completes_session() {
    let backend = ScriptedBackend::new();
    let mut reply = next_segment(2);
    reply.is_conclusion = true;
    backend.reply(Ok(reply));
    let c = controller_with(opening(), backend).await;

    let progress = c.request_choice(&sid(), 0, &choice_a()).await.unwrap();
    assert_eq!(
        progress,
        Progress::Advanced {
            index: 1,
            completed: true
        }
    );
    assert!(c.store().borrow().get_session(&sid()).unwrap().completed);
}

#[tokio::test]
async fn unanswered_questions_block_choice() {
    let first = opening().with_questions(three_questions());
    let c = controller_with(first, ScriptedBackend::new()).await;

    let progress = c.request_choice(&sid(), 0, &choice_a()).await.unwrap();
    assert_eq!(progress, Progress::Blocked(BlockReason::ComprehensionRequired));
    assert_eq!(BlockReason::ComprehensionRequired.code(), "comprehension-required");
    assert_eq!(segments(&c), 1);
    assert_eq!(c.backend().calls(), 0);
}

#[tokio::test]
async fn imperfect_retry_then_cap_unlocks() {
    let backend = ScriptedBackend::new();
    backend.reply(Ok(next_segment(2)));
    let c = controller_with(opening().with_questions(three_questions()), backend).await;

    let sub = answer_and_submit(&c, [0, 1, 0]);
    assert!(sub.all_answered);
    assert_eq!((sub.correct_count, sub.total), (2, 3));
    let snap = c.gate_snapshot(&sid()).unwrap().unwrap();
    assert_eq!(snap.attempts, 1);
    assert!(snap.passed);
    assert!(snap.can_retry);

    c.retry(&sid()).unwrap();
    let sub = answer_and_submit(&c, [0, 1, 1]);
    assert_eq!(sub.correct_count, 3);
    let snap = c.gate_snapshot(&sid()).unwrap().unwrap();
    assert_eq!(snap.attempts, 2);
    assert!(snap.passed);
    assert!(!snap.can_retry);
    assert!(snap.satisfied);

    let progress = c.request_choice(&sid(), 0, &choice_a()).await.unwrap();
    assert!(!progress.is_blocked());
}

#[tokio::test]
async fn retry_blocks_choice_until_resubmitted() {
    let c = controller_with(
        opening().with_questions(three_questions()),
        ScriptedBackend::new(),
    )
    .await;

    answer_and_submit(&c, [0, 0, 0]);
    c.retry(&sid()).unwrap();
    let snap = c.gate_snapshot(&sid()).unwrap().unwrap();
    assert_eq!(snap.attempts, 1);
    assert!(!snap.passed);
    assert_eq!(snap.state, GateState::Open);

    let progress = c.request_choice(&sid(), 0, &choice_a()).await.unwrap();
    assert_eq!(progress, Progress::Blocked(BlockReason::ComprehensionRequired));
    assert_eq!(c.backend().calls(), 0);
}

#[tokio::test]
async fn imperfect_answers_at_the_cap_still_unlock() {
    let backend = ScriptedBackend::new();
    backend.reply(Ok(next_segment(2)));
    let c = controller_with(opening().with_questions(three_questions()), backend).await;

    answer_and_submit(&c, [1, 0, 0]);
    c.retry(&sid()).unwrap();
    let sub = answer_and_submit(&c, [0, 0, 0]);
    assert_eq!((sub.correct_count, sub.total), (1, 3));

    let snap = c.gate_snapshot(&sid()).unwrap().unwrap();
    assert_eq!(snap.attempts, 2);
    assert!(!snap.can_retry);
    assert!(snap.satisfied);
    assert!(matches!(
        c.retry(&sid()),
        Err(ControllerError::Gate(GateError::RetryUnavailable))
    ));

    let progress = c.request_choice(&sid(), 0, &choice_a()).await.unwrap();
    assert_eq!(
        progress,
        Progress::Advanced {
            index: 1,
            completed: false
        }
    );
}

#[tokio::test]
async fn gate_outcome_survives_reload() {
    let c = controller_with(
        opening().with_questions(three_questions()),
        ScriptedBackend::new(),
    )
    .await;
    answer_and_submit(&c, [1, 0, 0]);
    c.retry(&sid()).unwrap();
    answer_and_submit(&c, [0, 0, 0]);

    let snapshot = c.store().borrow().snapshot();
    let json = serde_json::to_string(&snapshot).unwrap();
    let (store, report) = SessionStore::hydrate(serde_json::from_str(&json).unwrap());
    assert!(report.unusable.is_empty());

    let backend = ScriptedBackend::new();
    backend.reply(Ok(next_segment(2)));
    let reloaded = ProgressionController::new(store.shared(), backend, ReaderConfig::default());

    let snap = reloaded.gate_snapshot(&sid()).unwrap().unwrap();
    assert_eq!(snap.attempts, 2);
    assert!(snap.passed);
    assert!(snap.satisfied);
    assert!(!snap.can_retry);
    assert_eq!(snap.last_score.map(|s| s.correct), Some(1));

    let progress = reloaded
        .request_choice(&sid(), 0, &choice_a())
        .await
        .unwrap();
    assert!(!progress.is_blocked());
}

#[tokio::test]
async fn retried_gate_reloads_open_with_attempt_spent() {
    let c = controller_with(
        opening().with_questions(three_questions()),
        ScriptedBackend::new(),
    )
    .await;
    answer_and_submit(&c, [1, 0, 0]);
    c.retry(&sid()).unwrap();

    let (store, _) = SessionStore::hydrate(c.store().borrow().snapshot());
    let reloaded = ProgressionController::new(
        store.shared(),
        ScriptedBackend::new(),
        ReaderConfig::default(),
    );

    let snap = reloaded.gate_snapshot(&sid()).unwrap().unwrap();
    assert_eq!(snap.attempts, 1);
    assert!(!snap.passed);
    assert_eq!(snap.state, GateState::Open);
    let progress = reloaded
        .request_choice(&sid(), 0, &choice_a())
        .await
        .unwrap();
    assert_eq!(progress, Progress::Blocked(BlockReason::ComprehensionRequired));
}

#[tokio::test]
async fn perfect_first_try_unlocks_without_retry() {
    let backend = ScriptedBackend::new();
    backend.reply(Ok(next_segment(2)));
    let c = controller_with(opening().with_questions(three_questions()), backend).await;

    let sub = answer_and_submit(&c, [0, 1, 1]);
    assert_eq!(sub.correct_count, 3);
    let snap = c.gate_snapshot(&sid()).unwrap().unwrap();
    assert_eq!(snap.attempts, 1);
    assert!(!snap.can_retry);
    assert!(snap.satisfied);
    assert_eq!(snap.state, GateState::Locked);
    assert!(matches!(c.retry(&sid()), Err(ControllerError::Gate(_))));

    let progress = c.request_choice(&sid(), 0, &choice_a()).await.unwrap();
    assert!(!progress.is_blocked());
}

#[tokio::test]
async fn incomplete_submission_keeps_blocking() {
    let c = controller_with(opening().with_questions(three_questions()), ScriptedBackend::new())
        .await;

    c.answer(&sid(), 0, 0).unwrap();
    let sub = c.submit(&sid()).unwrap();
    assert!(!sub.all_answered);
    assert_eq!(c.gate_snapshot(&sid()).unwrap().unwrap().attempts, 0);

    let progress = c.request_end_story(&sid(), 0).await.unwrap();
    assert_eq!(progress, Progress::Blocked(BlockReason::ComprehensionRequired));
}

#[tokio::test]
async fn end_story_on_completed_session_is_a_no_op() {
    let backend = ScriptedBackend::new();
    backend.reply(Ok(ending_segment(2)));
    let c = controller_with(opening(), backend).await;

    let progress = c.request_end_story(&sid(), 0).await.unwrap();
    assert_eq!(
        progress,
        Progress::Advanced {
            index: 1,
            completed: true
        }
    );
    assert_eq!(c.backend().requests()[0].action, StoryAction::EndStory);

    let progress = c.request_end_story(&sid(), 1).await.unwrap();
    assert_eq!(progress, Progress::Blocked(BlockReason::AlreadyCompleted));
    assert_eq!(c.backend().calls(), 1);
    assert_eq!(segments(&c), 2);
}

#[tokio::test]
async fn explicit_end_completes_even_when_choices_returned() {
    let backend = ScriptedBackend::new();
    backend.reply(Ok(next_segment(2)));
    let c = controller_with(opening(), backend).await;

    let progress = c.request_end_story(&sid(), 0).await.unwrap();
    assert_eq!(
        progress,
        Progress::Advanced {
            index: 1,
            completed: true
        }
    );
}

#[tokio::test]
async fn backend_failure_leaves_state_untouched() {
    let backend = ScriptedBackend::new();
    backend.reply(Err(ExtensionError::Timeout));
    backend.reply(Ok(next_segment(2)));
    let c = controller_with(opening().with_questions(three_questions()), backend).await;
    answer_and_submit(&c, [0, 0, 0]);
    let before = c.gate_snapshot(&sid()).unwrap();

    let err = c.request_choice(&sid(), 0, &choice_a()).await.unwrap_err();
    assert_eq!(err, ControllerError::Extension(ExtensionError::Timeout));
    assert_eq!(segments(&c), 1);
    assert_eq!(c.gate_snapshot(&sid()).unwrap(), before);
    assert!(!c.is_in_flight(&sid()));

    let progress = c.request_choice(&sid(), 0, &choice_a()).await.unwrap();
    assert_eq!(
        progress,
        Progress::Advanced {
            index: 1,
            completed: false
        }
    );
    assert_eq!(segments(&c), 2);
}

#[tokio::test]
async fn prior_questions_patched_with_append() {
    let backend = ScriptedBackend::new();
    let mut reply = next_segment(2);
    reply.prior_questions = three_questions();
    backend.reply(Ok(reply));
    let c = controller_with(opening(), backend).await;

    c.request_choice(&sid(), 0, &choice_a()).await.unwrap();

    let store = c.store().borrow();
    let session = store.get_session(&sid()).unwrap();
    assert_eq!(session.len(), 2);
    assert_eq!(session.segments[0].comprehension_questions, three_questions());
    assert!(session.segments[1].comprehension_questions.is_empty());
}

#[tokio::test]
async fn existing_questions_are_not_overwritten() {
    let backend = ScriptedBackend::new();
    let mut reply = next_segment(2);
    reply.prior_questions = vec![fb_core::ComprehensionQuestion::new("New?", ["y", "n"], 0)];
    backend.reply(Ok(reply));
    let c = controller_with(opening().with_questions(three_questions()), backend).await;
    answer_and_submit(&c, [0, 1, 1]);

    c.request_choice(&sid(), 0, &choice_a()).await.unwrap();
    let store = c.store().borrow();
    assert_eq!(
        store.get_session(&sid()).unwrap().segments[0].comprehension_questions,
        three_questions()
    );
}

#[tokio::test]
async fn new_segment_with_questions_opens_gate() {
    let backend = ScriptedBackend::new();
    backend.reply(Ok(Extension {
        segment: Segment::new(2, "A river appeared.")
            .with_choices(ab_choices())
            .with_questions(three_questions()),
        prior_questions: Vec::new(),
        is_conclusion: false,
    }));
    let c = controller_with(opening(), backend).await;

    c.request_choice(&sid(), 0, &choice_a()).await.unwrap();
    let snap = c.gate_snapshot(&sid()).unwrap().unwrap();
    assert_eq!(snap.state, GateState::Open);
    assert_eq!(snap.attempts, 0);

    let progress = c.request_choice(&sid(), 1, &choice_a()).await.unwrap();
    assert_eq!(progress, Progress::Blocked(BlockReason::ComprehensionRequired));
}

#[tokio::test]
async fn invalid_choice_and_stale_index_rejected() {
    let backend = ScriptedBackend::new();
    backend.reply(Ok(next_segment(2)));
    let c = controller_with(opening(), backend).await;

    let err = c
        .request_choice(&sid(), 0, &Choice::new("Z", "Dig a tunnel"))
        .await
        .unwrap_err();
    assert!(matches!(err, ControllerError::InvalidChoice { index: 0, .. }));

    c.request_choice(&sid(), 0, &choice_a()).await.unwrap();
    let err = c.request_choice(&sid(), 0, &choice_a()).await.unwrap_err();
    assert_eq!(err, ControllerError::StaleSegment { index: 0, last: 1 });
    assert_eq!(c.backend().calls(), 1);
}

#[tokio::test]
async fn unknown_session_is_an_error() {
    let c = controller_with(opening(), ScriptedBackend::new()).await;
    let err = c
        .request_choice(&"missing".into(), 0, &choice_a())
        .await
        .unwrap_err();
    assert!(matches!(err, ControllerError::Store(_)));
}

#[tokio::test]
async fn second_intent_while_in_flight_is_suppressed() {
    let backend = ScriptedBackend::yielding();
    backend.reply(Ok(next_segment(2)));
    backend.reply(Ok(next_segment(3)));
    let c = controller_with(opening(), backend).await;
    let a = choice_a();
    let id = sid();

    let (first, second) = tokio::join!(
        c.request_choice(&id, 0, &a),
        c.request_choice(&id, 0, &a)
    );
    assert!(matches!(first.unwrap(), Progress::Advanced { index: 1, .. }));
    assert_eq!(
        second.unwrap(),
        Progress::Blocked(BlockReason::ExtensionInFlight)
    );
    assert_eq!(c.backend().calls(), 1);
    assert_eq!(segments(&c), 2);
    assert!(!c.is_in_flight(&sid()));
}

#[tokio::test]
async fn navigation_never_goes_back() {
    let backend = ScriptedBackend::new();
    backend.reply(Ok(next_segment(2)));
    let c = controller_with(opening(), backend).await;
    c.request_choice(&sid(), 0, &choice_a()).await.unwrap();

    assert_eq!(c.navigate(&sid(), 0).unwrap(), Navigation::Refused(1));
    assert_eq!(c.navigate(&sid(), 5).unwrap(), Navigation::Refused(1));
    assert_eq!(c.navigate(&sid(), 1).unwrap(), Navigation::Moved(1));
    assert_eq!(c.position(&sid()).unwrap(), 1);
}

#[tokio::test]
async fn patched_questions_on_current_segment_gate_progression() {
    let backend = ScriptedBackend::new();
    backend.reply(Ok(next_segment(2)));
    let c = controller_with(opening(), backend).await;

    c.store()
        .borrow_mut()
        .patch_comprehension_questions(&sid(), 0, three_questions())
        .unwrap();

    let progress = c.request_choice(&sid(), 0, &choice_a()).await.unwrap();
    assert_eq!(progress, Progress::Blocked(BlockReason::ComprehensionRequired));
}

#[tokio::test]
async fn start_story_makes_session_current() {
    let c = controller_with(opening(), ScriptedBackend::new()).await;
    let store = c.store().borrow();
    assert_eq!(store.current_id(), Some(&sid()));
    assert_eq!(store.current().unwrap().metadata.character, "Pip");
}
