//! Contracts for the external services the tutor talks to.
//!
//! Each collaborator is a black box; the session controller turns every
//! failure into a fallback value.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tutor_core::model::wire::{lenient_option, text};
use tutor_core::model::{Challenge, Feedback, Language, RawQuestion, RawQuiz, Story, Subject};

use crate::error::CollaboratorError;

mod http;
mod offline;

pub use http::HttpTutorApi;
pub use offline::Offline;

/// Conversation context sent along with a learner message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiContext {
    pub previous_messages: Vec<String>,
    pub user_level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiRequest {
    pub input: String,
    pub subject: Subject,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<AiContext>,
}

/// Reply from the content service. A malformed attachment is dropped on its
/// own and never costs the reply text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiResponse {
    #[serde(default, deserialize_with = "text")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_option")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub quiz: Option<RawQuiz>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub story: Option<Story>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub challenge: Option<Challenge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizRequest {
    pub subject: Subject,
    pub topic: String,
    pub language: Language,
}

/// Playable audio returned by the speech service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Answer a learner message.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError` if the service is unreachable or answers
    /// with an error.
    async fn respond(&self, request: &AiRequest) -> Result<AiResponse, CollaboratorError>;
}

#[async_trait]
pub trait QuizGenerator: Send + Sync {
    /// Produce questions for a topic. The questions are not yet validated.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError` if the service is unreachable or answers
    /// with an error.
    async fn generate_quiz(
        &self,
        request: &QuizRequest,
    ) -> Result<Vec<RawQuestion>, CollaboratorError>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// # Errors
    ///
    /// Returns `CollaboratorError` if no audio could be produced.
    async fn synthesize(
        &self,
        text: &str,
        language: Language,
    ) -> Result<AudioClip, CollaboratorError>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// # Errors
    ///
    /// Returns `CollaboratorError` if the text could not be translated.
    async fn translate(&self, text: &str, target: Language) -> Result<String, CollaboratorError>;
}

#[async_trait]
pub trait FeedbackSink: Send + Sync {
    /// # Errors
    ///
    /// Returns `CollaboratorError` if the feedback was not accepted.
    async fn submit(&self, feedback: &Feedback) -> Result<(), CollaboratorError>;
}

/// The full set of collaborators a session needs.
#[derive(Clone)]
pub struct Collaborators {
    pub content: Arc<dyn ContentGenerator>,
    pub quizzes: Arc<dyn QuizGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub translator: Arc<dyn Translator>,
    pub feedback: Arc<dyn FeedbackSink>,
}

impl Collaborators {
    /// Every collaborator disabled; sessions run entirely on fallbacks.
    #[must_use]
    pub fn offline() -> Self {
        let offline = Arc::new(Offline);
        Self {
            content: offline.clone(),
            quizzes: offline.clone(),
            speech: offline.clone(),
            translator: offline.clone(),
            feedback: offline,
        }
    }

    /// Every collaborator backed by one HTTP API.
    #[must_use]
    pub fn http(api: HttpTutorApi) -> Self {
        let api = Arc::new(api);
        Self {
            content: api.clone(),
            quizzes: api.clone(),
            speech: api.clone(),
            translator: api.clone(),
            feedback: api,
        }
    }
}
