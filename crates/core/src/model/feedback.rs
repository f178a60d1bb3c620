use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FeedbackError {
    #[error("feedback needs a rating or a comment")]
    Empty,
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(u8),
}

/// Validated learner feedback about the tutor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    feedback: Option<String>,
}

impl Feedback {
    /// # Errors
    ///
    /// Returns `FeedbackError::Empty` when neither a rating nor a non-blank
    /// comment is given, or `RatingOutOfRange` for ratings outside 1..=5.
    pub fn new(
        email: Option<String>,
        rating: Option<u8>,
        comment: Option<String>,
    ) -> Result<Self, FeedbackError> {
        if let Some(rating) = rating {
            if !(1..=5).contains(&rating) {
                return Err(FeedbackError::RatingOutOfRange(rating));
            }
        }
        let comment = comment
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());
        if rating.is_none() && comment.is_none() {
            return Err(FeedbackError::Empty);
        }
        Ok(Self {
            email,
            rating,
            feedback: comment,
        })
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn rating(&self) -> Option<u8> {
        self.rating
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Four stars and up.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.rating.is_some_and(|rating| rating >= 4)
    }
}
