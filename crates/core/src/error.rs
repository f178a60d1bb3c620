use thiserror::Error;

use crate::ledger::LedgerError;
use crate::model::{FeedbackError, ProfileError, QuizError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Feedback(#[from] FeedbackError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_layer_errors_transparently() {
        let err: Error = QuizError::Empty.into();
        assert!(matches!(err, Error::Quiz(QuizError::Empty)));
        assert_eq!(err.to_string(), QuizError::Empty.to_string());

        let err: Error = FeedbackError::Empty.into();
        assert_eq!(err.to_string(), "feedback needs a rating or a comment");
    }
}
