use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::model::subject::Subject;

/// Points needed to climb one level.
pub const POINTS_PER_LEVEL: u32 = 100;

/// Level reached with `total_points`: one level per hundred points, starting at 1.
#[must_use]
pub fn level_for_points(total_points: u32) -> u32 {
    total_points / POINTS_PER_LEVEL + 1
}

//
// ─── SUBJECT PROGRESS ─────────────────────────────────────────────────────────
//

/// Aggregate statistics for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectProgress {
    pub(crate) level: u32,
    pub(crate) points: u32,
    pub(crate) topics_completed: Vec<String>,
    /// Running mean of quiz percentages, rounded on every update.
    pub(crate) average_score: u32,
    /// Minutes.
    pub(crate) time_spent: u32,
    pub(crate) quizzes_completed: u32,
}

impl Default for SubjectProgress {
    fn default() -> Self {
        Self {
            level: 1,
            points: 0,
            topics_completed: Vec::new(),
            average_score: 0,
            time_spent: 0,
            quizzes_completed: 0,
        }
    }
}

impl SubjectProgress {
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn topics_completed(&self) -> &[String] {
        &self.topics_completed
    }

    #[must_use]
    pub fn average_score(&self) -> u32 {
        self.average_score
    }

    #[must_use]
    pub fn time_spent(&self) -> u32 {
        self.time_spent
    }

    #[must_use]
    pub fn quizzes_completed(&self) -> u32 {
        self.quizzes_completed
    }
}

//
// ─── USER PROGRESS ────────────────────────────────────────────────────────────
//

/// Per-learner gamification record.
///
/// Only the ledger produces modified copies; callers read through accessors.
/// Deserialization repairs the level so that
/// `level == total_points / 100 + 1` holds for every value in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "UserProgressWire")]
pub struct UserProgress {
    pub(crate) total_points: u32,
    pub(crate) level: u32,
    pub(crate) streak: u32,
    pub(crate) last_quiz_date: Option<NaiveDate>,
    pub(crate) quizzes_completed: u32,
    pub(crate) completed_challenges: u32,
    pub(crate) subject_progress: BTreeMap<Subject, SubjectProgress>,
    pub(crate) achievements: Vec<String>,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl UserProgress {
    /// Zeroed progress with a bucket for every subject.
    #[must_use]
    pub fn new() -> Self {
        Self {
            total_points: 0,
            level: 1,
            streak: 0,
            last_quiz_date: None,
            quizzes_completed: 0,
            completed_challenges: 0,
            subject_progress: Subject::ALL
                .into_iter()
                .map(|subject| (subject, SubjectProgress::default()))
                .collect(),
            achievements: Vec::new(),
        }
    }

    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.total_points
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn last_quiz_date(&self) -> Option<NaiveDate> {
        self.last_quiz_date
    }

    #[must_use]
    pub fn quizzes_completed(&self) -> u32 {
        self.quizzes_completed
    }

    #[must_use]
    pub fn completed_challenges(&self) -> u32 {
        self.completed_challenges
    }

    #[must_use]
    pub fn achievements(&self) -> &[String] {
        &self.achievements
    }

    #[must_use]
    pub fn subjects(&self) -> &BTreeMap<Subject, SubjectProgress> {
        &self.subject_progress
    }

    /// Statistics for `subject`, zeroed if the subject was never touched.
    #[must_use]
    pub fn subject(&self, subject: Subject) -> SubjectProgress {
        self.subject_progress
            .get(&subject)
            .cloned()
            .unwrap_or_default()
    }
}

//
// ─── WIRE SHAPE ───────────────────────────────────────────────────────────────
//

/// Lenient shape for records coming back from the store or the local cache.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UserProgressWire {
    total_points: u32,
    streak: u32,
    #[serde(deserialize_with = "deserialize_calendar_day")]
    last_quiz_date: Option<NaiveDate>,
    quizzes_completed: u32,
    completed_challenges: u32,
    #[serde(deserialize_with = "deserialize_subject_map")]
    subject_progress: BTreeMap<Subject, SubjectProgress>,
    achievements: Vec<String>,
}

impl Default for UserProgressWire {
    fn default() -> Self {
        Self {
            total_points: 0,
            streak: 0,
            last_quiz_date: None,
            quizzes_completed: 0,
            completed_challenges: 0,
            subject_progress: BTreeMap::new(),
            achievements: Vec::new(),
        }
    }
}

impl From<UserProgressWire> for UserProgress {
    fn from(wire: UserProgressWire) -> Self {
        let mut subject_progress = UserProgress::new().subject_progress;
        subject_progress.extend(wire.subject_progress);
        Self {
            total_points: wire.total_points,
            level: level_for_points(wire.total_points),
            streak: wire.streak,
            last_quiz_date: wire.last_quiz_date,
            quizzes_completed: wire.quizzes_completed,
            completed_challenges: wire.completed_challenges,
            subject_progress,
            achievements: wire.achievements,
        }
    }
}

/// Accepts `null`, a plain `YYYY-MM-DD` day, or a full RFC 3339 timestamp.
fn deserialize_calendar_day<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|value| !value.trim().is_empty()) else {
        return Ok(None);
    };
    if let Ok(day) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        return Ok(Some(day));
    }
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|at| Some(at.date_naive()))
        .map_err(serde::de::Error::custom)
}

/// Keeps the subjects this client knows and drops the rest.
fn deserialize_subject_map<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<Subject, SubjectProgress>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, SubjectProgress>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| key.parse::<Subject>().ok().map(|subject| (subject, value)))
        .collect())
}
