use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::activity::{Challenge, Story};
use crate::model::ids::MessageId;
use crate::model::quiz::{Quiz, QuizPrompt};
use crate::model::subject::Subject;

/// One transcript entry. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    id: MessageId,
    text: String,
    is_bot: bool,
    timestamp: DateTime<Utc>,
    subject: Subject,
    is_voice: bool,
    image: Option<String>,
    quiz: Option<Quiz>,
    quiz_prompt: Option<QuizPrompt>,
    story: Option<Story>,
    challenge: Option<Challenge>,
}

impl Message {
    /// Message typed or spoken by the learner.
    #[must_use]
    pub fn from_user(
        text: impl Into<String>,
        subject: Subject,
        is_voice: bool,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            is_voice,
            ..Self::plain(text.into(), false, subject, at)
        }
    }

    /// Plain bot reply without attachments.
    #[must_use]
    pub fn from_bot(text: impl Into<String>, subject: Subject, at: DateTime<Utc>) -> Self {
        Self::plain(text.into(), true, subject, at)
    }

    fn plain(text: String, is_bot: bool, subject: Subject, at: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::generate(),
            text,
            is_bot,
            timestamp: at,
            subject,
            is_voice: false,
            image: None,
            quiz: None,
            quiz_prompt: None,
            story: None,
            challenge: None,
        }
    }

    /// Attach a quiz; the prompt pointer is derived from it.
    #[must_use]
    pub fn with_quiz(mut self, quiz: Quiz) -> Self {
        self.quiz_prompt = Some(QuizPrompt::for_quiz(&quiz));
        self.quiz = Some(quiz);
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }

    #[must_use]
    pub fn with_story(mut self, story: Option<Story>) -> Self {
        self.story = story;
        self
    }

    #[must_use]
    pub fn with_challenge(mut self, challenge: Option<Challenge>) -> Self {
        self.challenge = challenge;
        self
    }

    #[must_use]
    pub fn id(&self) -> MessageId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_bot(&self) -> bool {
        self.is_bot
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn is_voice(&self) -> bool {
        self.is_voice
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    #[must_use]
    pub fn quiz_prompt(&self) -> Option<&QuizPrompt> {
        self.quiz_prompt.as_ref()
    }

    #[must_use]
    pub fn story(&self) -> Option<&Story> {
        self.story.as_ref()
    }

    #[must_use]
    pub fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn user_message_keeps_voice_flag() {
        let msg = Message::from_user("hi", Subject::Math, true, fixed_now());
        assert!(!msg.is_bot());
        assert!(msg.is_voice());
        assert_eq!(msg.subject(), Subject::Math);
    }

    #[test]
    fn attaching_quiz_sets_prompt() {
        let quiz = Quiz::offline_fallback("Plants");
        let msg = Message::from_bot("Let's learn", Subject::Science, fixed_now()).with_quiz(quiz);
        let prompt = msg.quiz_prompt().unwrap();
        assert_eq!(prompt.topic, "Plants");
        assert_eq!(&prompt.quiz_id, msg.quiz().unwrap().id());
    }
}
