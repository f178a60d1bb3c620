use async_trait::async_trait;
use tutor_core::model::{Feedback, Language, RawQuestion};

use super::{
    AiRequest, AiResponse, AudioClip, ContentGenerator, FeedbackSink, QuizGenerator, QuizRequest,
    SpeechSynthesizer, Translator,
};
use crate::error::CollaboratorError;

/// Stand-in used when no backend is configured. Every call fails with
/// `CollaboratorError::Disabled`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

#[async_trait]
impl ContentGenerator for Offline {
    async fn respond(&self, _request: &AiRequest) -> Result<AiResponse, CollaboratorError> {
        Err(CollaboratorError::Disabled)
    }
}

#[async_trait]
impl QuizGenerator for Offline {
    async fn generate_quiz(
        &self,
        _request: &QuizRequest,
    ) -> Result<Vec<RawQuestion>, CollaboratorError> {
        Err(CollaboratorError::Disabled)
    }
}

#[async_trait]
impl SpeechSynthesizer for Offline {
    async fn synthesize(
        &self,
        _text: &str,
        _language: Language,
    ) -> Result<AudioClip, CollaboratorError> {
        Err(CollaboratorError::Disabled)
    }
}

#[async_trait]
impl Translator for Offline {
    async fn translate(
        &self,
        _text: &str,
        _target: Language,
    ) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Disabled)
    }
}

#[async_trait]
impl FeedbackSink for Offline {
    async fn submit(&self, _feedback: &Feedback) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::Disabled)
    }
}
