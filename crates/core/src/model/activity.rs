use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::quiz::Difficulty;

/// Character appearing in an interactive story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub personality: String,
}

/// Interactive story delivered inside a bot reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub moral: Option<String>,
    #[serde(default)]
    pub illustrations: Vec<String>,
}

/// What the learner did with a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryAction {
    StartReading,
    NextPage,
    StoryComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeKind {
    #[default]
    Daily,
    Weekly,
    Special,
}

/// Challenge offered inside a bot reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: ChallengeKind,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_reads_type_field() {
        let challenge: Challenge = serde_json::from_str(
            r#"{"id":"c1","title":"Count birds","description":"Count 5 birds","type":"weekly","points":40}"#,
        )
        .unwrap();
        assert_eq!(challenge.kind, ChallengeKind::Weekly);
        assert_eq!(challenge.difficulty, Difficulty::Medium);
        assert!(!challenge.completed);
    }

    #[test]
    fn story_action_uses_snake_case() {
        let action: StoryAction = serde_json::from_str("\"story_complete\"").unwrap();
        assert_eq!(action, StoryAction::StoryComplete);
    }
}
