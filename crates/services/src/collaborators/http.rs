use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use storage::repository::{ProgressRepository, StorageError};
use tutor_core::model::wire::lenient_list;
use tutor_core::model::{Feedback, Language, RawQuestion, UserProgress};
use url::Url;

use super::{
    AiRequest, AiResponse, AudioClip, ContentGenerator, FeedbackSink, QuizGenerator, QuizRequest,
    SpeechSynthesizer, Translator,
};
use crate::error::CollaboratorError;

/// Client for the tutor backend, which fronts the AI, quiz, speech,
/// translation, feedback and progress endpoints.
#[derive(Clone, Debug)]
pub struct HttpTutorApi {
    client: Client,
    base_url: Url,
}

impl HttpTutorApi {
    /// # Errors
    ///
    /// Returns `CollaboratorError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, CollaboratorError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, CollaboratorError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CollaboratorError::HttpStatus(response.status()));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ContentGenerator for HttpTutorApi {
    async fn respond(&self, request: &AiRequest) -> Result<AiResponse, CollaboratorError> {
        let response: AiResponse = self.post_json("api", request).await?;
        if response.text.trim().is_empty() {
            return Err(CollaboratorError::EmptyResponse);
        }
        Ok(response)
    }
}

#[async_trait]
impl QuizGenerator for HttpTutorApi {
    async fn generate_quiz(
        &self,
        request: &QuizRequest,
    ) -> Result<Vec<RawQuestion>, CollaboratorError> {
        let body: QuizResponse = self.post_json("api/generate-quiz", request).await?;
        Ok(body.questions)
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpTutorApi {
    async fn synthesize(
        &self,
        text: &str,
        language: Language,
    ) -> Result<AudioClip, CollaboratorError> {
        let response = self
            .client
            .post(self.endpoint("api/tts"))
            .json(&SpeechRequest {
                text,
                lang: language,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CollaboratorError::HttpStatus(response.status()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_owned();
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(CollaboratorError::EmptyResponse);
        }

        Ok(AudioClip {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

#[async_trait]
impl Translator for HttpTutorApi {
    async fn translate(&self, text: &str, target: Language) -> Result<String, CollaboratorError> {
        let body: TranslateResponse = self
            .post_json("api/translate", &TranslateRequest { text, target })
            .await?;
        body.translation
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty())
            .ok_or(CollaboratorError::EmptyResponse)
    }
}

#[async_trait]
impl FeedbackSink for HttpTutorApi {
    async fn submit(&self, feedback: &Feedback) -> Result<(), CollaboratorError> {
        let response = self
            .client
            .post(self.endpoint("api/auth/feedback"))
            .json(feedback)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CollaboratorError::HttpStatus(response.status()));
        }
        Ok(())
    }
}

/// Remote progress store. Reads and writes share one endpoint: a body with
/// only `email` reads, a body with `progress` writes.
#[async_trait]
impl ProgressRepository for HttpTutorApi {
    async fn get_progress(&self, email: &str) -> Result<Option<UserProgress>, StorageError> {
        let body: ProgressResponse = self
            .post_json(
                "api/progress/update",
                &ProgressRequest {
                    email,
                    progress: None,
                },
            )
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(body.progress)
    }

    async fn save_progress(
        &self,
        email: &str,
        progress: &UserProgress,
    ) -> Result<(), StorageError> {
        let body: ProgressResponse = self
            .post_json(
                "api/progress/update",
                &ProgressRequest {
                    email,
                    progress: Some(progress),
                },
            )
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if body.success == Some(false) {
            return Err(StorageError::Connection(
                CollaboratorError::Rejected.to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct QuizResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    lang: Language,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    target: Language,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translation: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProgressRequest<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<&'a UserProgress>,
}

#[derive(Debug, Deserialize)]
struct ProgressResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    progress: Option<UserProgress>,
}
