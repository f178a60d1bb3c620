#![forbid(unsafe_code)]

pub mod app_services;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod family_service;
pub mod learner_service;
pub mod progress_service;
pub mod session;

pub use tutor_core::Clock;

pub use app_services::AppServices;
pub use config::TutorConfig;
pub use error::{
    AppServicesError, CollaboratorError, ConfigError, FamilyError, LearnerError, SessionError,
};
pub use family_service::{FamilyDashboard, FamilyService, MemberSummary};
pub use learner_service::LearnerService;
pub use progress_service::ProgressService;
pub use session::{QuizSource, QuizTick, SessionController, SessionNotice, SessionSettings};
