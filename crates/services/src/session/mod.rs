mod controller;
pub mod messages;
mod timer;

pub use controller::{QuizSource, QuizTick, SessionController, SessionNotice, SessionSettings};
pub use timer::{FeedbackElapsed, FeedbackTimer};
