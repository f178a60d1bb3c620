use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use services::collaborators::{
    AiRequest, AiResponse, Collaborators, ContentGenerator, FeedbackSink, QuizGenerator,
    QuizRequest,
};
use services::session::messages;
use services::{
    CollaboratorError, ProgressService, QuizSource, QuizTick, SessionController, SessionNotice,
    SessionSettings,
};
use storage::cache::{InMemorySessionCache, SessionCache};
use storage::repository::{InMemoryRepository, ProgressRepository, StorageError};
use tutor_core::model::{
    Feedback, Language, LearnerProfile, RawIndex, RawQuestion, RawQuiz, StoryAction, Subject, UserId,
    UserProgress, ViewState,
};
use tutor_core::quiz_engine::QuizPhase;
use tutor_core::time::{fixed_clock, fixed_now};

const DWELL: Duration = Duration::from_millis(1800);

// ─── Fakes ──────────────────────────────────────────────────────────────────

struct NoQuestions;

#[async_trait]
impl QuizGenerator for NoQuestions {
    async fn generate_quiz(&self, _: &QuizRequest) -> Result<Vec<RawQuestion>, CollaboratorError> {
        Ok(Vec::new())
    }
}

/// Replies with a fixed text and a one-question quiz, recording requests.
#[derive(Default)]
struct QuizReply {
    requests: Mutex<Vec<AiRequest>>,
}

#[async_trait]
impl ContentGenerator for QuizReply {
    async fn respond(&self, request: &AiRequest) -> Result<AiResponse, CollaboratorError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(AiResponse {
            text: "Volcanoes are openings in the crust.".into(),
            quiz: Some(RawQuiz {
                id: Some("1712000000000".into()),
                topic: "Volcanoes".into(),
                questions: vec![RawQuestion {
                    question: "What comes out of a volcano?".into(),
                    options: vec!["Lava".into(), "Milk".into()],
                    correct_answer: Some(RawIndex::Index(0)),
                    ..RawQuestion::default()
                }],
            }),
            ..AiResponse::default()
        })
    }
}

#[derive(Default)]
struct RecordingSink {
    received: Mutex<Vec<Feedback>>,
}

#[async_trait]
impl FeedbackSink for RecordingSink {
    async fn submit(&self, feedback: &Feedback) -> Result<(), CollaboratorError> {
        self.received.lock().unwrap().push(feedback.clone());
        Ok(())
    }
}

struct Unreachable;

#[async_trait]
impl ProgressRepository for Unreachable {
    async fn get_progress(&self, _: &str) -> Result<Option<UserProgress>, StorageError> {
        Err(StorageError::Connection("refused".into()))
    }

    async fn save_progress(&self, _: &str, _: &UserProgress) -> Result<(), StorageError> {
        Err(StorageError::Connection("refused".into()))
    }
}

/// Store whose first write is slow, so a later write could overtake it.
#[derive(Default)]
struct SlowFirstSave {
    saved: Mutex<Vec<u32>>,
}

#[async_trait]
impl ProgressRepository for SlowFirstSave {
    async fn get_progress(&self, _: &str) -> Result<Option<UserProgress>, StorageError> {
        Ok(None)
    }

    async fn save_progress(&self, _: &str, progress: &UserProgress) -> Result<(), StorageError> {
        let first = self.saved.lock().unwrap().is_empty();
        if first {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        self.saved.lock().unwrap().push(progress.total_points());
        Ok(())
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn session_with(collaborators: Collaborators) -> SessionController {
    let progress = ProgressService::new(
        Arc::new(InMemoryRepository::new()),
        Arc::new(InMemorySessionCache::new()),
    );
    SessionController::new(
        fixed_clock(),
        collaborators,
        progress,
        SessionSettings {
            language: Language::En,
            feedback_dwell: DWELL,
        },
    )
}

fn without_quiz_generator() -> Collaborators {
    let mut collaborators = Collaborators::offline();
    collaborators.quizzes = Arc::new(NoQuestions);
    collaborators
}

fn learner() -> LearnerProfile {
    LearnerProfile::new(
        UserId::new("kid-1"),
        "Arjun",
        Some("arjun@example.com".into()),
        fixed_now(),
    )
    .unwrap()
}

// ─── Conversation ───────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_reply_appends_exactly_one_apology() {
    let mut session = session_with(Collaborators::offline());
    let before = session.progress().clone();

    assert!(session.send_message("Why is the sky blue?", false).await);

    let texts: Vec<&str> = session.messages().iter().map(|m| m.text()).collect();
    assert_eq!(texts.len(), 3);
    assert_eq!(texts[0], messages::welcome(Language::En));
    assert_eq!(texts[1], "Why is the sky blue?");
    assert_eq!(texts[2], messages::AI_FALLBACK);
    assert!(!session.messages()[1].is_bot());
    assert!(session.messages()[2].is_bot());
    assert_eq!(session.progress(), &before);
    assert!(matches!(session.view(), ViewState::ChatSummary { .. }));
}

#[tokio::test]
async fn blank_message_changes_nothing() {
    let mut session = session_with(Collaborators::offline());
    assert!(!session.send_message("   ", false).await);
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.view(), &ViewState::Home);
}

#[tokio::test]
async fn reply_quiz_can_be_played_from_the_transcript() {
    let content = Arc::new(QuizReply::default());
    let mut collaborators = Collaborators::offline();
    collaborators.content = content.clone();
    let mut session = session_with(collaborators);
    session.login(None, learner()).await;
    session.change_subject(Subject::Science, None);

    assert!(session.send_message("Tell me about volcanoes", true).await);
    {
        let requests = content.requests.lock().unwrap();
        let context = requests[0].context.as_ref().unwrap();
        assert_eq!(requests[0].subject, Subject::Science);
        assert_eq!(context.previous_messages.len(), 1);
        assert_eq!(context.user_level, 1);
    }
    assert!(session.messages()[1].is_voice());

    let prompt = session.latest_quiz_prompt().unwrap().clone();
    assert_eq!(prompt.topic, "Volcanoes");
    assert_eq!(prompt.quiz_id.as_str(), "1712000000000");

    assert!(session.start_quiz_from_prompt(&prompt.quiz_id));
    assert_eq!(
        session.view(),
        &ViewState::QuizActive {
            subject: Subject::Science,
            topic: Some("Volcanoes".into()),
        }
    );
    assert_eq!(session.quiz_phase(), QuizPhase::Active { index: 0 });

    let outcome = session.complete_quiz(1).unwrap();
    assert_eq!(outcome.points_earned, 50);
    assert_eq!(session.progress().subject(Subject::Science).points(), 50);
}

#[tokio::test]
async fn context_holds_at_most_five_earlier_messages() {
    let content = Arc::new(QuizReply::default());
    let mut collaborators = Collaborators::offline();
    collaborators.content = content.clone();
    let mut session = session_with(collaborators);

    for n in 0..4 {
        session.send_message(&format!("question {n}"), false).await;
    }
    let requests = content.requests.lock().unwrap();
    let last = requests.last().unwrap().context.as_ref().unwrap();
    assert_eq!(last.previous_messages.len(), 5);
    assert_eq!(last.previous_messages[4], "Volcanoes are openings in the crust.");
}

#[tokio::test]
async fn unknown_quiz_id_does_not_start_anything() {
    let mut session = session_with(Collaborators::offline());
    assert!(!session.start_quiz_from_prompt(&tutor_core::model::QuizId::new("missing")));
    assert_eq!(session.quiz_phase(), QuizPhase::Idle);
    assert_eq!(session.view(), &ViewState::Home);
}

#[tokio::test]
async fn changing_language_restarts_the_transcript() {
    let mut session = session_with(Collaborators::offline());
    session.send_message("hello", false).await;
    session.change_language(Language::Hi);

    assert_eq!(session.language(), Language::Hi);
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].text(), messages::welcome(Language::Hi));
}

// ─── Quiz flow ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_generator_result_falls_back_to_sample_questions() {
    let mut session = session_with(without_quiz_generator());
    session.change_subject(Subject::Science, Some("Volcanoes"));

    assert_eq!(session.start_quiz_from_topic().await, QuizSource::Fallback);
    let run = session.quiz_run().unwrap();
    assert_eq!(run.question_count(), 2);
    assert_eq!(
        run.current_question().unwrap().question(),
        "Sample question 1 about Volcanoes"
    );
    assert_eq!(run.quiz().questions()[1].options(), ["True", "False"]);
}

#[tokio::test(start_paused = true)]
async fn feedback_dwell_advances_and_completes_the_quiz() {
    let mut session = session_with(without_quiz_generator());
    session.login(None, learner()).await;
    session.change_subject(Subject::Science, Some("Volcanoes"));
    session.start_quiz_from_topic().await;

    let first = session.submit_answer(0).unwrap();
    assert!(first.correct);
    assert_eq!(session.quiz_phase(), QuizPhase::Feedback { index: 0 });
    assert!(session.submit_answer(1).is_none());

    assert_eq!(session.run_feedback().await, Some(QuizTick::Next { index: 1 }));
    assert!(session.last_answer().is_none());

    let second = session.submit_answer(0).unwrap();
    assert!(!second.correct);
    assert_eq!(second.revealed_correct_index(), Some(1));

    let Some(QuizTick::Completed(outcome)) = session.run_feedback().await else {
        panic!("quiz should complete after the last dwell");
    };
    assert_eq!((outcome.score, outcome.question_count), (1, 2));
    assert_eq!(outcome.points_earned, 15);
    assert_eq!(session.progress().total_points(), 15);
    assert_eq!(session.progress().streak(), 1);
    assert_eq!(session.quiz_phase(), QuizPhase::Idle);
    assert_eq!(
        session.view(),
        &ViewState::ChatSummary {
            subject: Subject::Science,
            topic: Some("Volcanoes".into()),
        }
    );
    assert!(
        session
            .messages()
            .last()
            .unwrap()
            .text()
            .starts_with("🎉 Quiz completed! You scored 1/2 (50%) and earned 15 points!")
    );
    session.flush().await;
}

#[tokio::test(start_paused = true)]
async fn going_back_during_feedback_cancels_the_dwell() {
    let mut session = session_with(without_quiz_generator());
    session.change_subject(Subject::Science, Some("Volcanoes"));
    session.start_quiz_from_topic().await;
    session.submit_answer(0).unwrap();
    assert!(session.feedback_pending());

    assert!(session.back());
    assert_eq!(
        session.view(),
        &ViewState::TopicPrompt {
            subject: Subject::Science,
            topic: "Volcanoes".into(),
        }
    );
    assert!(!session.feedback_pending());
    assert_eq!(session.quiz_phase(), QuizPhase::Idle);

    let fired = tokio::time::timeout(DWELL * 3, session.feedback_elapsed()).await;
    assert!(fired.is_err());
    assert!(session.run_feedback().await.is_none());
    assert_eq!(session.progress(), &UserProgress::new());
}

#[tokio::test(start_paused = true)]
async fn restarting_from_the_topic_during_feedback_cancels_the_old_dwell() {
    let mut session = session_with(without_quiz_generator());
    session.change_subject(Subject::Science, Some("Volcanoes"));
    session.start_quiz_from_topic().await;
    assert!(session.submit_answer(0).unwrap().correct);
    assert!(session.feedback_pending());

    session.start_quiz_from_topic().await;
    assert!(!session.feedback_pending());

    let fired = tokio::time::timeout(DWELL * 3, session.feedback_elapsed()).await;
    assert!(fired.is_err());
    assert!(session.run_feedback().await.is_none());
    assert_eq!(session.quiz_phase(), QuizPhase::Active { index: 0 });
    assert_eq!(session.quiz_run().unwrap().correct_count(), 0);
    assert_eq!(session.progress(), &UserProgress::new());
}

#[tokio::test(start_paused = true)]
async fn restarting_from_a_prompt_during_feedback_cancels_the_old_dwell() {
    let mut collaborators = Collaborators::offline();
    collaborators.content = Arc::new(QuizReply::default());
    let mut session = session_with(collaborators);
    assert!(session.send_message("Tell me about volcanoes", false).await);
    let quiz_id = session.latest_quiz_prompt().unwrap().quiz_id.clone();

    assert!(session.start_quiz_from_prompt(&quiz_id));
    assert!(session.submit_answer(0).unwrap().correct);
    assert!(session.feedback_pending());

    assert!(session.start_quiz_from_prompt(&quiz_id));
    assert!(!session.feedback_pending());

    let fired = tokio::time::timeout(DWELL * 3, session.feedback_elapsed()).await;
    assert!(fired.is_err());
    assert_eq!(session.quiz_phase(), QuizPhase::Active { index: 0 });
    assert_eq!(session.quiz_run().unwrap().correct_count(), 0);
    assert_eq!(session.progress(), &UserProgress::new());
}

#[tokio::test]
async fn forward_into_a_quiz_restores_only_the_view() {
    let mut session = session_with(without_quiz_generator());
    session.change_subject(Subject::Math, Some("Fractions"));
    session.start_quiz_from_topic().await;

    assert!(session.back());
    assert!(session.forward());
    assert!(session.view().is_quiz());
    assert!(session.quiz_run().is_none());
    assert!(session.submit_answer(0).is_none());
    assert!(!session.forward());
}

#[tokio::test]
async fn back_from_the_first_view_lands_home() {
    let mut session = session_with(Collaborators::offline());
    session.change_subject(Subject::English, None);

    assert!(session.back());
    assert_eq!(session.view(), &ViewState::Home);
    assert!(!session.back());
}

// ─── Rewards and persistence ────────────────────────────────────────────────

#[tokio::test]
async fn progress_write_failure_is_not_fatal() {
    let cache = Arc::new(InMemorySessionCache::new());
    let progress = ProgressService::new(Arc::new(Unreachable), cache.clone());
    let mut session = SessionController::new(
        fixed_clock(),
        Collaborators::offline(),
        progress,
        SessionSettings::default(),
    );
    session.login(None, learner()).await;
    assert_eq!(session.progress(), &UserProgress::new());

    session.accept_challenge();
    session.flush().await;

    assert_eq!(session.progress().total_points(), 10);
    assert_eq!(session.progress().completed_challenges(), 1);
    assert_eq!(
        session.messages().last().unwrap().text(),
        messages::CHALLENGE_ACCEPTED
    );
    let cached = cache.load().unwrap().progress.unwrap();
    assert_eq!(&cached, session.progress());
}

#[tokio::test(start_paused = true)]
async fn progress_writes_reach_the_store_in_order() {
    let store = Arc::new(SlowFirstSave::default());
    let progress = ProgressService::new(store.clone(), Arc::new(InMemorySessionCache::new()));
    let mut session = SessionController::new(
        fixed_clock(),
        Collaborators::offline(),
        progress,
        SessionSettings::default(),
    );
    session.login(None, learner()).await;

    session.accept_challenge();
    session.accept_challenge();
    session.flush().await;

    assert_eq!(*store.saved.lock().unwrap(), [10, 20]);
    assert_eq!(session.progress().total_points(), 20);
}

#[tokio::test]
async fn only_finishing_a_story_awards_points() {
    let mut session = session_with(Collaborators::offline());
    session.story_action(StoryAction::StartReading);
    session.story_action(StoryAction::NextPage);
    assert_eq!(session.progress().total_points(), 0);

    session.story_action(StoryAction::StoryComplete);
    assert_eq!(session.progress().total_points(), 20);
    assert_eq!(session.progress().subject(Subject::Stories).points(), 20);
    assert_eq!(session.messages().len(), 4);
}

// ─── Speech, translation, feedback ──────────────────────────────────────────

#[tokio::test]
async fn offline_speech_and_translation_degrade_gracefully() {
    let session = session_with(Collaborators::offline());
    assert_eq!(
        session.speak("hello").await,
        Err(SessionNotice::SpeechUnavailable)
    );
    assert_eq!(session.translate("hello").await, "hello");
}

#[tokio::test]
async fn feedback_is_sent_with_the_learner_email() {
    let sink = Arc::new(RecordingSink::default());
    let mut collaborators = Collaborators::offline();
    collaborators.feedback = sink.clone();
    let mut session = session_with(collaborators);
    session.login(None, learner()).await;

    session.submit_feedback(Some(5), Some("Fun!")).await.unwrap();
    let received = sink.received.lock().unwrap();
    assert_eq!(received[0].email(), Some("arjun@example.com"));
    assert_eq!(received[0].comment(), Some("Fun!"));
    assert_eq!(
        session.messages().last().unwrap().text(),
        messages::feedback_thanks(true)
    );
}

#[tokio::test]
async fn rejected_feedback_leaves_the_transcript_alone() {
    let mut session = session_with(Collaborators::offline());

    let err = session.submit_feedback(Some(9), None).await.unwrap_err();
    assert!(matches!(err, SessionNotice::InvalidFeedback(_)));
    let err = session.submit_feedback(Some(4), None).await.unwrap_err();
    assert_eq!(err, SessionNotice::FeedbackNotSent);
    assert_eq!(session.messages().len(), 1);
}

#[tokio::test]
async fn logout_clears_learner_and_cache() {
    let mut session = session_with(Collaborators::offline());
    session.login(Some("token".into()), learner()).await;
    session.accept_challenge();
    assert!(session.learner().is_some());

    session.logout();
    assert!(session.learner().is_none());
    assert_eq!(session.progress(), &UserProgress::new());
    assert_eq!(session.messages().len(), 1);
    assert!(!session.resume());
}
