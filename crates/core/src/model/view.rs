use serde::{Deserialize, Serialize};

use crate::model::subject::Subject;

/// What the learner is looking at.
///
/// Each variant carries exactly the data that view needs, so combinations
/// like "quiz active while on the home screen" cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Home,
    TopicPrompt {
        subject: Subject,
        topic: String,
    },
    ChatSummary {
        subject: Subject,
        topic: Option<String>,
    },
    QuizActive {
        subject: Subject,
        topic: Option<String>,
    },
}

impl ViewState {
    #[must_use]
    pub fn kind(&self) -> ViewKind {
        match self {
            ViewState::Home => ViewKind::Home,
            ViewState::TopicPrompt { .. } => ViewKind::TopicPrompt,
            ViewState::ChatSummary { .. } => ViewKind::Summary,
            ViewState::QuizActive { .. } => ViewKind::Quiz,
        }
    }

    /// Subject in effect; `explore` on the home screen.
    #[must_use]
    pub fn subject(&self) -> Subject {
        match self {
            ViewState::Home => Subject::Explore,
            ViewState::TopicPrompt { subject, .. }
            | ViewState::ChatSummary { subject, .. }
            | ViewState::QuizActive { subject, .. } => *subject,
        }
    }

    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        match self {
            ViewState::Home => None,
            ViewState::TopicPrompt { topic, .. } => Some(topic.as_str()),
            ViewState::ChatSummary { topic, .. } | ViewState::QuizActive { topic, .. } => {
                topic.as_deref()
            }
        }
    }

    #[must_use]
    pub fn is_quiz(&self) -> bool {
        matches!(self, ViewState::QuizActive { .. })
    }

    /// History record for this view.
    #[must_use]
    pub fn to_entry(&self) -> HistoryEntry {
        HistoryEntry {
            view: self.kind(),
            subject: match self {
                ViewState::Home => None,
                _ => Some(self.subject()),
            },
            topic: self.topic().map(str::to_owned),
        }
    }
}

/// Tag stored in a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewKind {
    Home,
    TopicPrompt,
    Summary,
    Quiz,
}

/// Durable, serializable snapshot of a view, as kept on the history stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub view: ViewKind,
    #[serde(default)]
    pub subject: Option<Subject>,
    #[serde(default)]
    pub topic: Option<String>,
}

/// Rebuild the view for a history position. `None` is the initial page.
///
/// Total: every entry maps to some view, missing subjects fall back to
/// `explore` and a topic prompt without a topic gets an empty one.
#[must_use]
pub fn restore(entry: Option<&HistoryEntry>) -> ViewState {
    let Some(entry) = entry else {
        return ViewState::Home;
    };
    let subject = entry.subject.unwrap_or_default();
    let topic = entry.topic.clone().filter(|topic| !topic.is_empty());
    match entry.view {
        ViewKind::Home => ViewState::Home,
        ViewKind::TopicPrompt => ViewState::TopicPrompt {
            subject,
            topic: topic.unwrap_or_default(),
        },
        ViewKind::Summary => ViewState::ChatSummary { subject, topic },
        ViewKind::Quiz => ViewState::QuizActive { subject, topic },
    }
}
