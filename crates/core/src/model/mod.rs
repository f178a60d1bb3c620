mod activity;
mod feedback;
mod ids;
mod message;
mod profile;
mod progress;
mod quiz;
mod subject;
mod view;
pub mod wire;

pub use activity::{Challenge, ChallengeKind, Character, Story, StoryAction};
pub use feedback::{Feedback, FeedbackError};
pub use ids::{FamilyId, MessageId, ParseIdError, QuizId, UserId};
pub use message::Message;
pub use profile::{Family, LearnerProfile, ProfileError};
pub use progress::{POINTS_PER_LEVEL, SubjectProgress, UserProgress, level_for_points};
pub use quiz::{
    DEFAULT_QUESTION_POINTS, Difficulty, QuestionKind, Question, Quiz, QuizError, QuizPrompt,
    RawIndex, RawQuestion, RawQuiz,
};
pub use subject::{Language, ParseCatalogError, Subject};
pub use view::{HistoryEntry, ViewKind, ViewState, restore};
