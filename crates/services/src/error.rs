//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use tutor_core::ledger::LedgerError;
use tutor_core::model::{FamilyId, ParseCatalogError, ProfileError, QuizError};

/// Errors emitted by the HTTP collaborators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CollaboratorError {
    #[error("collaborator is not configured")]
    Disabled,
    #[error("collaborator returned an empty response")]
    EmptyResponse,
    #[error("collaborator request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("collaborator rejected the request")]
    Rejected,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid URL in {var}: {raw}")]
    InvalidUrl {
        var: &'static str,
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{var} must use http or https: {raw}")]
    UnsupportedScheme { var: &'static str, raw: String },
    #[error(transparent)]
    Language(#[from] ParseCatalogError),
    #[error("{var} must be a non-negative integer, got {raw:?}")]
    InvalidNumber { var: &'static str, raw: String },
}

/// Errors emitted by the session controller for caller mistakes.
///
/// Collaborator failures never show up here; they are absorbed into
/// fallback messages.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no quiz attempt is in progress")]
    NoActiveQuiz,
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Errors emitted by `FamilyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FamilyError {
    #[error("family {0} not found")]
    NotFound(FamilyId),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LearnerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LearnerError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error(transparent)]
    Learner(#[from] LearnerError),
}
