mod common;

use std::sync::Arc;

use quiz_core::model::{
    Activity, ActivityRegistry, Difficulty, PlayerId, Settings, SettingsUpdate, SubjectEntry,
};
use services::collaborators::NoFreeTextEvaluator;
use services::{Outcome, SessionError, SessionStatus};

use common::{
    RIGHT, ScriptedProvider, ScriptedSubmitter, WRONG, english_player, manual_options, player,
    session, session_with, settle,
};

#[tokio::test]
async fn select_player_seeds_settings_from_preferences() {
    let s = session(
        Arc::new(ScriptedProvider::new()),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10),
    );
    assert_eq!(s.snapshot().status, SessionStatus::NoPlayer);

    assert_eq!(s.select_player(english_player(1, "Ava")), Outcome::Applied);
    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::Idle);
    assert_eq!(snap.settings.subject(), "English");
    assert_eq!(snap.settings.sub_activity(), "Grammar Correction");
    assert_eq!(snap.settings.difficulty(), Difficulty::Medium);
}

#[tokio::test]
async fn start_requires_player_and_idle() {
    let provider = Arc::new(ScriptedProvider::new());
    let s = session(
        Arc::clone(&provider),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10),
    );
    assert_eq!(s.start_session(None).await.unwrap(), Outcome::Ignored);

    let _ = s.select_player(player(1, "Ava"));
    assert_eq!(s.start_session(None).await.unwrap(), Outcome::Applied);
    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::QuestionActive);
    assert!(!snap.is_fetching_question);
    assert_eq!(snap.question.as_ref().unwrap().text(), "Question 1");

    assert_eq!(s.start_session(None).await.unwrap(), Outcome::Ignored);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn start_failure_returns_to_idle() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.fail_next(1);
    let s = session(
        Arc::clone(&provider),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10),
    );
    let _ = s.select_player(player(1, "Ava"));

    let err = s.start_session(None).await.unwrap_err();
    assert!(matches!(err, SessionError::ProviderUnavailable(_)));
    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::Idle);
    assert!(snap.error.is_some());
    assert!(snap.question.is_none());

    assert_eq!(s.start_session(None).await.unwrap(), Outcome::Applied);
    assert!(s.snapshot().error.is_none());
}

#[tokio::test]
async fn start_with_invalid_settings_leaves_state_unchanged() {
    let s = session(
        Arc::new(ScriptedProvider::new()),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10),
    );
    let _ = s.select_player(player(1, "Ava"));

    let spelling =
        Settings::validated(&ActivityRegistry::builtin(), "English", "Spelling", Difficulty::Hard)
            .unwrap();
    assert_eq!(s.start_session(Some(spelling)).await.unwrap(), Outcome::Applied);
    assert_eq!(s.snapshot().question.unwrap().sub_activity(), "Spelling");
    let _ = s.reset_session(true);

    let music = ActivityRegistry::new(vec![SubjectEntry {
        name: "Music".into(),
        activities: vec![Activity::exact("Rhythm")],
    }])
    .unwrap();
    let rhythm = Settings::validated(&music, "Music", "Rhythm", Difficulty::Easy).unwrap();

    let err = s.start_session(Some(rhythm)).await.unwrap_err();
    assert!(matches!(err, SessionError::Settings(_)));
    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::Idle);
    assert_eq!(snap.settings.subject(), "English");
    assert_eq!(snap.settings.sub_activity(), "Spelling");
}

#[tokio::test]
async fn counters_follow_each_answer() {
    let s = session(
        Arc::new(ScriptedProvider::new()),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10),
    );
    let _ = s.select_player(player(1, "Ava"));
    let _ = s.start_session(None).await.unwrap();

    let answers = [RIGHT, WRONG, RIGHT, RIGHT, RIGHT, WRONG];
    let mut streaks = Vec::new();
    let mut last_score = 0;
    for (i, answer) in answers.iter().enumerate() {
        assert_eq!(s.submit_answer(answer).await.unwrap(), Outcome::Applied);
        let snap = s.snapshot();
        assert_eq!(snap.status, SessionStatus::FeedbackShown);
        assert_eq!(snap.counters.rounds_played, u32::try_from(i).unwrap() + 1);
        assert!(snap.counters.score >= last_score);
        last_score = snap.counters.score;
        streaks.push(snap.counters.streak);

        let feedback = snap.feedback.unwrap();
        assert_eq!(feedback.is_correct, *answer == RIGHT);
        assert_eq!(feedback.correct_answer, RIGHT);
        assert!(!feedback.ai_evaluated);

        assert_eq!(s.advance().await.unwrap(), Outcome::Applied);
        assert!(s.snapshot().feedback.is_none());
    }
    assert_eq!(streaks, vec![1, 0, 1, 2, 3, 0]);
    // 10 + 10 + 10 + (10 + 5)
    assert_eq!(last_score, 45);
}

#[tokio::test(start_paused = true)]
async fn double_submit_counts_once() {
    let submitter = Arc::new(ScriptedSubmitter::gated());
    let s = session(
        Arc::new(ScriptedProvider::new()),
        Arc::clone(&submitter),
        manual_options(10),
    );
    let _ = s.select_player(player(1, "Ava"));
    let _ = s.start_session(None).await.unwrap();

    let first = tokio::spawn({
        let s = s.clone();
        async move { s.submit_answer(RIGHT).await }
    });
    settle().await;
    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::AnswerPending);
    assert!(snap.is_evaluating_answer);

    assert_eq!(s.submit_answer(RIGHT).await.unwrap(), Outcome::Ignored);
    submitter.gate.release(1);
    assert_eq!(first.await.unwrap().unwrap(), Outcome::Applied);

    assert_eq!(s.submit_answer(RIGHT).await.unwrap(), Outcome::Ignored);
    let snap = s.snapshot();
    assert_eq!(snap.counters.rounds_played, 1);
    assert_eq!(snap.counters.score, 10);
    assert_eq!(submitter.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn late_question_after_reset_is_discarded() {
    let provider = Arc::new(ScriptedProvider::gated());
    let s = session(
        Arc::clone(&provider),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10),
    );
    let _ = s.select_player(player(1, "Ava"));

    let pending = tokio::spawn({
        let s = s.clone();
        async move { s.start_session(None).await }
    });
    settle().await;
    assert_eq!(s.snapshot().status, SessionStatus::AwaitingQuestion);

    assert_eq!(s.reset_session(true), Outcome::Applied);
    provider.gate.release(1);
    assert_eq!(pending.await.unwrap().unwrap(), Outcome::Stale);

    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::Idle);
    assert!(snap.question.is_none());
    assert!(!snap.is_fetching_question);
}

#[tokio::test(start_paused = true)]
async fn late_verdict_after_player_change_is_discarded() {
    let submitter = Arc::new(ScriptedSubmitter::gated());
    let s = session(
        Arc::new(ScriptedProvider::new()),
        Arc::clone(&submitter),
        manual_options(10),
    );
    let _ = s.select_player(player(1, "Ava"));
    let _ = s.start_session(None).await.unwrap();

    let pending = tokio::spawn({
        let s = s.clone();
        async move { s.submit_answer(RIGHT).await }
    });
    settle().await;

    let _ = s.select_player(player(2, "Noah"));
    submitter.gate.release(1);
    assert_eq!(pending.await.unwrap().unwrap(), Outcome::Stale);

    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::Idle);
    assert_eq!(snap.player.unwrap().name(), "Noah");
    assert_eq!(snap.counters.rounds_played, 0);
    assert!(snap.feedback.is_none());
}

#[tokio::test(start_paused = true)]
async fn late_next_question_after_reset_is_discarded() {
    let provider = Arc::new(ScriptedProvider::gated());
    let s = session(
        Arc::clone(&provider),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10),
    );
    let _ = s.select_player(player(1, "Ava"));
    provider.gate.release(1);
    let _ = s.start_session(None).await.unwrap();
    let _ = s.submit_answer(RIGHT).await.unwrap();

    let pending = tokio::spawn({
        let s = s.clone();
        async move { s.advance().await }
    });
    settle().await;
    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::AwaitingNextQuestion);
    assert!(snap.is_fetching_question);

    assert_eq!(s.reset_session(true), Outcome::Applied);
    provider.gate.release(1);
    assert_eq!(pending.await.unwrap().unwrap(), Outcome::Stale);

    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::Idle);
    assert!(snap.question.is_none());
    assert!(snap.feedback.is_none());
    assert!(snap.error.is_none());
    assert!(!snap.is_fetching_question);
    assert!(!snap.is_advancing);
    assert_eq!(snap.counters.rounds_played, 0);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn late_next_question_after_player_change_is_discarded() {
    let provider = Arc::new(ScriptedProvider::gated());
    let s = session(
        Arc::clone(&provider),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10),
    );
    let _ = s.select_player(player(1, "Ava"));
    provider.gate.release(1);
    let _ = s.start_session(None).await.unwrap();
    let _ = s.submit_answer(WRONG).await.unwrap();

    let pending = tokio::spawn({
        let s = s.clone();
        async move { s.advance().await }
    });
    settle().await;

    let _ = s.select_player(english_player(2, "Noah"));
    provider.gate.release(1);
    assert_eq!(pending.await.unwrap().unwrap(), Outcome::Stale);

    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::Idle);
    assert_eq!(snap.player.unwrap().name(), "Noah");
    assert_eq!(snap.settings.subject(), "English");
    assert!(snap.question.is_none());
    assert!(!snap.is_fetching_question);
    assert_eq!(snap.counters.rounds_played, 0);
}

#[tokio::test(start_paused = true)]
async fn prefetch_from_before_reset_is_never_used() {
    let provider = Arc::new(ScriptedProvider::gated());
    let s = session(
        Arc::clone(&provider),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10).with_prefetch(true),
    );
    let _ = s.select_player(player(1, "Ava"));
    provider.gate.release(1);
    let _ = s.start_session(None).await.unwrap();
    let _ = s.submit_answer(RIGHT).await.unwrap();
    settle().await;
    // "Question 2" is being prefetched and waits at the gate.
    assert_eq!(provider.calls(), 2);

    assert_eq!(s.reset_session(true), Outcome::Applied);
    provider.gate.release(1);
    settle().await;

    provider.gate.release(10);
    let _ = s.start_session(None).await.unwrap();
    assert_eq!(s.snapshot().question.unwrap().text(), "Question 3");
    let _ = s.submit_answer(RIGHT).await.unwrap();
    settle().await;
    assert_eq!(provider.calls(), 4);

    // Same round number as the old prefetch, but only the new one is used.
    assert_eq!(s.advance().await.unwrap(), Outcome::Applied);
    assert_eq!(provider.calls(), 4);
    let snap = s.snapshot();
    assert_eq!(snap.question.unwrap().text(), "Question 4");
    assert_eq!(snap.counters.rounds_played, 1);
}

#[tokio::test]
async fn free_text_falls_back_to_local_comparison() {
    let provider = Arc::new(ScriptedProvider::new().with_answer("The Cats Are Playing"));
    let submitter = Arc::new(ScriptedSubmitter::new());
    let s = session(Arc::clone(&provider), Arc::clone(&submitter), manual_options(10));
    let _ = s.select_player(english_player(1, "Ava"));
    let _ = s.start_session(None).await.unwrap();

    assert_eq!(
        s.submit_answer("the cats are playing").await.unwrap(),
        Outcome::Applied
    );
    let snap = s.snapshot();
    let feedback = snap.feedback.unwrap();
    assert!(feedback.is_correct);
    assert!(!feedback.ai_evaluated);
    assert_eq!(feedback.correct_answer, "The Cats Are Playing");
    assert_eq!(snap.counters.score, 10);
    assert_eq!(submitter.calls(), 0);
}

#[tokio::test]
async fn five_correct_rounds_complete_the_session() {
    let s = session(
        Arc::new(ScriptedProvider::new()),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(5),
    );
    let _ = s.select_player(player(1, "Ava"));
    let _ = s.start_session(None).await.unwrap();

    for round in 1..=5 {
        assert_eq!(s.submit_answer(RIGHT).await.unwrap(), Outcome::Applied);
        if round < 5 {
            assert_eq!(s.advance().await.unwrap(), Outcome::Applied);
        }
    }

    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::Completed);
    assert_eq!(snap.counters.streak, 5);
    assert_eq!(snap.counters.rounds_played, 5);
    // 5 * 10 + bonus(3) + bonus(4) + bonus(5) = 50 + 5 + 5 + 10
    assert_eq!(snap.counters.score, 70);
    assert_eq!(snap.round(), 5);

    assert_eq!(s.advance().await.unwrap(), Outcome::Ignored);
    assert_eq!(s.submit_answer(RIGHT).await.unwrap(), Outcome::Ignored);

    let _ = s.reset_session(true);
    assert_eq!(s.start_session(None).await.unwrap(), Outcome::Applied);
    assert_eq!(s.snapshot().counters.score, 0);
}

#[tokio::test]
async fn failed_submit_keeps_question_active() {
    let submitter = Arc::new(ScriptedSubmitter::new());
    submitter.fail_next(1);
    let s = session(
        Arc::new(ScriptedProvider::new()),
        Arc::clone(&submitter),
        manual_options(10),
    );
    let _ = s.select_player(player(1, "Ava"));
    let _ = s.start_session(None).await.unwrap();

    let err = s.submit_answer(RIGHT).await.unwrap_err();
    assert!(matches!(err, SessionError::SubmitFailed(_)));
    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::QuestionActive);
    assert_eq!(snap.counters.rounds_played, 0);
    assert!(snap.error.is_some());

    assert_eq!(s.submit_answer(RIGHT).await.unwrap(), Outcome::Applied);
    assert_eq!(s.snapshot().counters.rounds_played, 1);
}

#[tokio::test]
async fn advance_can_be_retried_after_provider_failure() {
    let provider = Arc::new(ScriptedProvider::new());
    let s = session(
        Arc::clone(&provider),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10),
    );
    let _ = s.select_player(player(1, "Ava"));
    let _ = s.start_session(None).await.unwrap();
    let _ = s.submit_answer(RIGHT).await.unwrap();

    provider.fail_next(1);
    let err = s.advance().await.unwrap_err();
    assert!(matches!(err, SessionError::ProviderUnavailable(_)));
    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::AwaitingNextQuestion);
    assert!(!snap.is_fetching_question);
    assert!(!snap.is_advancing);
    assert!(snap.error.is_some());

    assert_eq!(s.advance().await.unwrap(), Outcome::Applied);
    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::QuestionActive);
    assert_eq!(snap.counters.rounds_played, 1);
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn mismatched_question_is_flagged_not_rejected() {
    let provider = Arc::new(ScriptedProvider::new().filed_under("Science", "Animals"));
    let s = session(
        Arc::clone(&provider),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10),
    );
    let _ = s.select_player(player(1, "Ava"));
    let _ = s.start_session(None).await.unwrap();

    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::QuestionActive);
    assert!(snap.question_mismatch);
    assert_eq!(snap.question.unwrap().subject(), "Science");
}

#[tokio::test(start_paused = true)]
async fn prefetched_question_is_used_on_advance() {
    let provider = Arc::new(ScriptedProvider::new());
    let s = session(
        Arc::clone(&provider),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10).with_prefetch(true),
    );
    let _ = s.select_player(player(1, "Ava"));
    let _ = s.start_session(None).await.unwrap();
    let _ = s.submit_answer(RIGHT).await.unwrap();
    settle().await;
    assert_eq!(provider.calls(), 2);

    assert_eq!(s.advance().await.unwrap(), Outcome::Applied);
    assert_eq!(provider.calls(), 2);
    assert_eq!(s.snapshot().question.unwrap().text(), "Question 2");
}

#[tokio::test(start_paused = true)]
async fn settings_change_discards_prefetched_question() {
    let provider = Arc::new(ScriptedProvider::new());
    let s = session(
        Arc::clone(&provider),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10).with_prefetch(true),
    );
    let _ = s.select_player(player(1, "Ava"));
    let _ = s.start_session(None).await.unwrap();
    let _ = s.submit_answer(RIGHT).await.unwrap();
    settle().await;

    let update = SettingsUpdate::subject("Science");
    assert_eq!(s.update_settings(&update).unwrap(), Outcome::Applied);
    assert_eq!(s.advance().await.unwrap(), Outcome::Applied);
    assert_eq!(provider.calls(), 3);
    let question = s.snapshot().question.unwrap();
    assert_eq!(question.subject(), "Science");
    assert_eq!(question.sub_activity(), "Animals");
}

#[tokio::test]
async fn rejected_settings_update_reports_error() {
    let s = session(
        Arc::new(ScriptedProvider::new()),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10),
    );
    let update = SettingsUpdate::subject("English");
    assert_eq!(s.update_settings(&update).unwrap(), Outcome::Ignored);

    let _ = s.select_player(player(1, "Ava"));
    let update = SettingsUpdate::subject("English").with_sub_activity("Fractions");
    let err = s.update_settings(&update).unwrap_err();
    assert!(matches!(err, SessionError::Settings(_)));
    let snap = s.snapshot();
    assert_eq!(snap.settings.subject(), "English");
    assert_eq!(snap.settings.sub_activity(), "Reading Comprehension");
}

#[tokio::test]
async fn forgetting_the_current_player_resets() {
    let s = session(
        Arc::new(ScriptedProvider::new()),
        Arc::new(ScriptedSubmitter::new()),
        manual_options(10),
    );
    let ava = player(1, "Ava");
    let _ = s.select_player(ava.clone());
    let _ = s.start_session(None).await.unwrap();

    assert_eq!(
        s.forget_player(PlayerId::new(9)),
        Outcome::Ignored
    );
    assert_eq!(s.forget_player(ava.id()), Outcome::Applied);
    let snap = s.snapshot();
    assert_eq!(snap.status, SessionStatus::NoPlayer);
    assert!(snap.player.is_none());
    assert!(snap.question.is_none());
}

#[tokio::test]
async fn subscribers_see_every_transition() {
    let s = session_with(
        Arc::new(ScriptedProvider::new()),
        Arc::new(ScriptedSubmitter::new()),
        Arc::new(NoFreeTextEvaluator),
        manual_options(10),
    );
    let mut rx = s.subscribe();
    let _ = s.select_player(player(1, "Ava"));
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().status, SessionStatus::Idle);

    let _ = s.start_session(None).await.unwrap();
    assert_eq!(rx.borrow_and_update().status, SessionStatus::QuestionActive);
}
