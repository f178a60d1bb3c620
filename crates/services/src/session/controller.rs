use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use tutor_core::Clock;
use tutor_core::ledger::{self, QuizCompletion, QuizOutcome};
use tutor_core::model::{
    Feedback, FeedbackError, Language, LearnerProfile, Message, Quiz, QuizId, QuizPrompt,
    StoryAction, Subject, UserProgress, ViewState,
};
use tutor_core::navigation::NavigationHistory;
use tutor_core::quiz_engine::{Advance, AnswerFeedback, QuizEngine, QuizPhase, QuizRunState};

use super::messages;
use super::timer::{FeedbackElapsed, FeedbackTimer};
use crate::collaborators::{AiContext, AiRequest, AudioClip, Collaborators, QuizRequest};
use crate::config::DEFAULT_FEEDBACK_DWELL;
use crate::error::SessionError;
use crate::progress_service::ProgressService;

/// How many earlier transcript messages are sent as AI context.
const CONTEXT_MESSAGES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub language: Language,
    pub feedback_dwell: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            language: Language::default(),
            feedback_dwell: DEFAULT_FEEDBACK_DWELL,
        }
    }
}

/// Where the questions of a started quiz came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizSource {
    Generated,
    Fallback,
    Prompt,
}

/// Result of leaving the feedback phase.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizTick {
    Next { index: usize },
    Completed(QuizOutcome),
}

/// Non-fatal problems shown to the learner as a dismissible notice.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionNotice {
    #[error("{}", messages::SPEECH_UNAVAILABLE)]
    SpeechUnavailable,
    #[error(transparent)]
    InvalidFeedback(#[from] FeedbackError),
    #[error("{}", messages::FEEDBACK_FAILED)]
    FeedbackNotSent,
}

/// Owns one learner session: transcript, view, quiz attempt and progress.
///
/// Every method runs to completion before the next one starts (`&mut self`),
/// which gives the ordering guarantees of the session: a learner message is
/// appended before its reply, and only one quiz attempt exists at a time.
/// Collaborator failures are absorbed here and never returned.
pub struct SessionController {
    clock: Clock,
    collaborators: Collaborators,
    progress_service: ProgressService,
    language: Language,
    learner: Option<LearnerProfile>,
    progress: UserProgress,
    messages: Vec<Message>,
    view: ViewState,
    history: NavigationHistory,
    engine: QuizEngine,
    timer: FeedbackTimer,
    last_answer: Option<AnswerFeedback>,
}

impl SessionController {
    #[must_use]
    pub fn new(
        clock: Clock,
        collaborators: Collaborators,
        progress_service: ProgressService,
        settings: SessionSettings,
    ) -> Self {
        let welcome = Message::from_bot(
            messages::welcome(settings.language),
            Subject::Explore,
            clock.now(),
        );
        Self {
            clock,
            collaborators,
            progress_service,
            language: settings.language,
            learner: None,
            progress: UserProgress::new(),
            messages: vec![welcome],
            view: ViewState::Home,
            history: NavigationHistory::new(),
            engine: QuizEngine::new(),
            timer: FeedbackTimer::new(settings.feedback_dwell),
            last_answer: None,
        }
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    #[must_use]
    pub fn progress(&self) -> &UserProgress {
        &self.progress
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub fn learner(&self) -> Option<&LearnerProfile> {
        self.learner.as_ref()
    }

    #[must_use]
    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    #[must_use]
    pub fn quiz_run(&self) -> Option<&QuizRunState> {
        self.engine.run()
    }

    #[must_use]
    pub fn quiz_phase(&self) -> QuizPhase {
        self.engine.phase()
    }

    /// Feedback for the answer currently on display.
    #[must_use]
    pub fn last_answer(&self) -> Option<AnswerFeedback> {
        self.last_answer
    }

    #[must_use]
    pub fn feedback_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// The most recent quiz offered in the transcript.
    #[must_use]
    pub fn latest_quiz_prompt(&self) -> Option<&QuizPrompt> {
        self.messages.iter().rev().find_map(Message::quiz_prompt)
    }

    //
    // ─── ACCOUNT ───────────────────────────────────────────────────────────
    //

    /// Sign a learner in and load their progress.
    pub async fn login(&mut self, token: Option<String>, learner: LearnerProfile) {
        self.progress = self.progress_service.login(token, &learner).await;
        info!(learner = %learner.id(), level = self.progress.level(), "learner signed in");
        self.learner = Some(learner);
    }

    /// Pick up the learner and progress left in the local cache.
    ///
    /// Returns false when nothing usable was cached.
    pub fn resume(&mut self) -> bool {
        let Some((learner, progress)) = self.progress_service.resume() else {
            return false;
        };
        info!(learner = %learner.id(), "resumed cached session");
        self.learner = Some(learner);
        self.progress = progress;
        true
    }

    /// Forget the learner, clear the local cache and start over.
    pub fn logout(&mut self) {
        self.abandon_quiz();
        self.progress_service.logout();
        self.learner = None;
        self.progress = UserProgress::new();
        self.view = ViewState::Home;
        self.history = NavigationHistory::new();
        self.reset_transcript();
    }

    //
    // ─── CONVERSATION ──────────────────────────────────────────────────────
    //

    /// Send a learner message and wait for the reply.
    ///
    /// Returns false, changing nothing, for blank input.
    pub async fn send_message(&mut self, text: &str, is_voice: bool) -> bool {
        if text.trim().is_empty() {
            return false;
        }

        let subject = self.view.subject();
        if !matches!(self.view, ViewState::ChatSummary { .. }) {
            let topic = self.view.topic().map(str::to_owned);
            self.enter(ViewState::ChatSummary { subject, topic });
        }

        let start = self.messages.len().saturating_sub(CONTEXT_MESSAGES);
        let context = AiContext {
            previous_messages: self.messages[start..]
                .iter()
                .map(|message| message.text().to_owned())
                .collect(),
            user_level: self.progress.level(),
        };
        self.messages
            .push(Message::from_user(text, subject, is_voice, self.clock.now()));

        let request = AiRequest {
            input: text.to_owned(),
            subject,
            language: self.language,
            context: Some(context),
        };
        let reply = match self.collaborators.content.respond(&request).await {
            Ok(response) => {
                let mut reply = Message::from_bot(response.text, subject, self.clock.now())
                    .with_image(response.image)
                    .with_story(response.story)
                    .with_challenge(response.challenge);
                if let Some(raw) = response.quiz {
                    match Quiz::from_raw(raw) {
                        Ok(quiz) => reply = reply.with_quiz(quiz),
                        Err(err) => warn!(%subject, error = %err, "dropping unusable quiz from reply"),
                    }
                }
                reply
            }
            Err(err) => {
                warn!(%subject, error = %err, "content request failed");
                Message::from_bot(messages::AI_FALLBACK, subject, self.clock.now())
            }
        };
        self.messages.push(reply);
        true
    }

    /// Switch the language. The transcript restarts with a fresh greeting.
    pub fn change_language(&mut self, language: Language) {
        self.language = language;
        self.reset_transcript();
    }

    /// Select a subject, optionally with a topic to offer a quiz about.
    pub fn change_subject(&mut self, subject: Subject, topic: Option<&str>) {
        let topic = topic.map(str::trim).filter(|topic| !topic.is_empty());
        let view = match topic {
            Some(topic) => ViewState::TopicPrompt {
                subject,
                topic: topic.to_owned(),
            },
            None => ViewState::ChatSummary {
                subject,
                topic: None,
            },
        };
        self.enter(view);
    }

    /// From the topic prompt, choose to chat about the topic instead.
    pub fn ask_question(&mut self) -> bool {
        let ViewState::TopicPrompt { subject, topic } = &self.view else {
            return false;
        };
        let view = ViewState::ChatSummary {
            subject: *subject,
            topic: Some(topic.clone()).filter(|topic| !topic.is_empty()),
        };
        self.enter(view);
        true
    }

    pub fn go_home(&mut self) {
        self.enter(ViewState::Home);
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────
    //

    /// Browser-style back. Returns false at the start of history.
    pub fn back(&mut self) -> bool {
        match self.history.back() {
            Some(view) => {
                self.restore(view);
                true
            }
            None => false,
        }
    }

    /// Browser-style forward. Returns false at the end of history.
    pub fn forward(&mut self) -> bool {
        match self.history.forward() {
            Some(view) => {
                self.restore(view);
                true
            }
            None => false,
        }
    }

    //
    // ─── QUIZ ──────────────────────────────────────────────────────────────
    //

    /// Start a quiz about the selected topic.
    ///
    /// An unreachable generator or an unusable answer falls back to the two
    /// offline sample questions.
    pub async fn start_quiz_from_topic(&mut self) -> QuizSource {
        self.abandon_quiz();
        let subject = self.view.subject();
        let topic = self.view.topic().unwrap_or_default().to_owned();
        self.enter(ViewState::QuizActive {
            subject,
            topic: Some(topic.clone()).filter(|topic| !topic.is_empty()),
        });

        let request = QuizRequest {
            subject,
            topic: topic.clone(),
            language: self.language,
        };
        let generated = match self.collaborators.quizzes.generate_quiz(&request).await {
            Ok(questions) if questions.is_empty() => {
                warn!(%subject, %topic, "quiz generator returned no questions");
                None
            }
            Ok(questions) => match Quiz::from_raw_questions(QuizId::generate(), &topic, questions)
            {
                Ok(quiz) => Some(quiz),
                Err(err) => {
                    warn!(%subject, %topic, error = %err, "no usable generated questions");
                    None
                }
            },
            Err(err) => {
                warn!(%subject, %topic, error = %err, "quiz generation failed");
                None
            }
        };

        let (quiz, source) = match generated {
            Some(quiz) => (quiz, QuizSource::Generated),
            None => (Quiz::offline_fallback(&topic), QuizSource::Fallback),
        };
        self.begin_attempt(quiz);
        source
    }

    /// Start the quiz attached to an earlier bot reply.
    ///
    /// Returns false if no message in the transcript carries that quiz.
    pub fn start_quiz_from_prompt(&mut self, quiz_id: &QuizId) -> bool {
        let Some(quiz) = self
            .messages
            .iter()
            .rev()
            .filter_map(Message::quiz)
            .find(|quiz| quiz.id() == quiz_id)
            .cloned()
        else {
            return false;
        };

        self.abandon_quiz();
        self.enter(ViewState::QuizActive {
            subject: self.view.subject(),
            topic: Some(quiz.topic().to_owned()).filter(|topic| !topic.is_empty()),
        });
        self.begin_attempt(quiz);
        debug!(quiz = %quiz_id, source = ?QuizSource::Prompt, "quiz started");
        true
    }

    /// Answer the current question and start the feedback dwell.
    ///
    /// Ignored (returns `None`) outside the quiz view, while feedback is
    /// showing, or for an index that is not an option.
    pub fn submit_answer(&mut self, index: usize) -> Option<AnswerFeedback> {
        if !self.view.is_quiz() {
            return None;
        }
        let feedback = self.engine.submit_answer(index)?;
        debug!(
            question = feedback.question_index,
            correct = feedback.correct,
            "answer recorded"
        );
        self.last_answer = Some(feedback);
        self.timer.schedule();
        Some(feedback)
    }

    /// Wait until the feedback dwell ends. Pending forever when no dwell is
    /// running, so it can sit in a `select!` loop.
    pub async fn feedback_elapsed(&mut self) -> FeedbackElapsed {
        self.timer.elapsed().await
    }

    /// Wait out the running dwell, if any, then advance.
    pub async fn run_feedback(&mut self) -> Option<QuizTick> {
        if !self.timer.is_pending() {
            return None;
        }
        self.timer.elapsed().await;
        self.advance_quiz()
    }

    /// Leave the feedback phase now: next question, or score the attempt.
    pub fn advance_quiz(&mut self) -> Option<QuizTick> {
        self.timer.cancel();
        match self.engine.advance()? {
            Advance::Next { index } => {
                self.last_answer = None;
                Some(QuizTick::Next { index })
            }
            Advance::Complete { score, .. } => match self.complete_quiz(score) {
                Ok(outcome) => Some(QuizTick::Completed(outcome)),
                Err(err) => {
                    warn!(error = %err, "could not score finished quiz");
                    self.abandon_quiz();
                    None
                }
            },
        }
    }

    /// Score the current attempt and return to the chat view.
    ///
    /// The new progress is cached right away and written to the store in the
    /// background.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveQuiz` without an attempt, or
    /// `SessionError::Ledger` if `score` exceeds the number of questions.
    pub fn complete_quiz(&mut self, score: u32) -> Result<QuizOutcome, SessionError> {
        let run = self.engine.run().ok_or(SessionError::NoActiveQuiz)?;
        let question_count = u32::try_from(run.question_count()).unwrap_or(u32::MAX);
        let subject = self.view.subject();

        let outcome = ledger::record_quiz(
            &self.progress,
            QuizCompletion {
                subject,
                score,
                question_count,
            },
            self.clock.today(),
        )?;
        info!(
            %subject,
            score,
            question_count,
            points = outcome.points_earned,
            level = outcome.new_level(),
            streak = outcome.progress.streak(),
            "quiz completed"
        );

        self.progress = outcome.progress.clone();
        self.push_bot(messages::quiz_completed(&outcome));
        self.abandon_quiz();
        let topic = self.view.topic().map(str::to_owned);
        self.enter(ViewState::ChatSummary { subject, topic });
        self.persist();
        Ok(outcome)
    }

    //
    // ─── STORIES AND CHALLENGES ────────────────────────────────────────────
    //

    pub fn accept_challenge(&mut self) {
        self.progress = ledger::record_challenge_accepted(&self.progress);
        self.push_bot(messages::CHALLENGE_ACCEPTED);
        self.persist();
    }

    pub fn story_action(&mut self, action: StoryAction) {
        self.push_bot(messages::story_action(action));
        if action == StoryAction::StoryComplete {
            self.progress = ledger::record_story_completed(&self.progress);
            self.persist();
        }
    }

    //
    // ─── SPEECH, TRANSLATION, FEEDBACK ─────────────────────────────────────
    //

    /// Read `text` aloud in the session language.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotice::SpeechUnavailable` if no audio could be made.
    pub async fn speak(&self, text: &str) -> Result<AudioClip, SessionNotice> {
        self.collaborators
            .speech
            .synthesize(text, self.language)
            .await
            .map_err(|err| {
                warn!(error = %err, "speech synthesis failed");
                SessionNotice::SpeechUnavailable
            })
    }

    /// Translate `text` into the session language, or return it unchanged.
    pub async fn translate(&self, text: &str) -> String {
        match self.collaborators.translator.translate(text, self.language).await {
            Ok(translated) => translated,
            Err(err) => {
                warn!(language = %self.language, error = %err, "translation failed");
                text.to_owned()
            }
        }
    }

    /// Send feedback about the tutor and thank the learner in the transcript.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotice` for invalid feedback or when it could not be
    /// delivered; the transcript is left unchanged.
    pub async fn submit_feedback(
        &mut self,
        rating: Option<u8>,
        comment: Option<&str>,
    ) -> Result<(), SessionNotice> {
        let email = self
            .learner
            .as_ref()
            .and_then(LearnerProfile::email)
            .map(str::to_owned);
        let feedback = Feedback::new(email, rating, comment.map(str::to_owned))?;

        if let Err(err) = self.collaborators.feedback.submit(&feedback).await {
            warn!(error = %err, "feedback submission failed");
            return Err(SessionNotice::FeedbackNotSent);
        }

        self.push_bot(messages::feedback_thanks(feedback.is_positive()));
        Ok(())
    }

    /// Wait for background progress writes started so far.
    pub async fn flush(&mut self) {
        self.progress_service.flush().await;
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────
    //

    /// Enter `view` as a new navigation step.
    fn enter(&mut self, view: ViewState) {
        if self.view.is_quiz() && !view.is_quiz() {
            self.abandon_quiz();
        }
        debug!(view = ?view.kind(), subject = %view.subject(), topic = view.topic(), "view changed");
        self.history.push(&view);
        self.view = view;
    }

    /// Show a view taken from history. Never replays side effects.
    fn restore(&mut self, view: ViewState) {
        if self.view.is_quiz() {
            self.abandon_quiz();
        }
        debug!(view = ?view.kind(), subject = %view.subject(), "view restored from history");
        self.view = view;
    }

    fn begin_attempt(&mut self, quiz: Quiz) {
        self.engine.reset();
        let topic = quiz.topic().to_owned();
        let questions = quiz.len();
        if let Err(err) = self.engine.start(quiz) {
            warn!(error = %err, "could not start quiz attempt");
            return;
        }
        debug!(%topic, questions, "quiz attempt started");
    }

    /// Drop the running attempt and its pending dwell.
    fn abandon_quiz(&mut self) {
        if self.timer.cancel() {
            debug!("pending quiz feedback cancelled");
        }
        self.engine.reset();
        self.last_answer = None;
    }

    fn push_bot(&mut self, text: impl Into<String>) {
        let message = Message::from_bot(text, self.view.subject(), self.clock.now());
        self.messages.push(message);
    }

    fn reset_transcript(&mut self) {
        self.messages = vec![Message::from_bot(
            messages::welcome(self.language),
            Subject::Explore,
            self.clock.now(),
        )];
    }

    fn persist(&self) {
        let email = self.learner.as_ref().and_then(LearnerProfile::email);
        self.progress_service.persist(email, &self.progress);
    }
}
