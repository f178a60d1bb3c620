//! Pure progress rules: points, levels, streaks and per-subject averages.
//!
//! Every function takes the previous record by reference and returns a new
//! one; nothing here mutates its input or touches the clock.

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{Subject, UserProgress, level_for_points};

/// Flat reward for accepting a challenge.
pub const CHALLENGE_POINTS: u32 = 10;
/// Flat reward for finishing a story; also credited to the `stories` bucket.
pub const STORY_POINTS: u32 = 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("a quiz needs at least one question")]
    NoQuestions,
    #[error("score {score} exceeds question count {question_count}")]
    ScoreOutOfRange { score: u32, question_count: u32 },
}

/// Share of correct answers in percent, unrounded.
#[must_use]
pub fn percentage(score: u32, question_count: u32) -> f64 {
    if question_count == 0 {
        return 0.0;
    }
    100.0 * f64::from(score) / f64::from(question_count)
}

/// Points tier for a quiz percentage; first matching tier wins.
#[must_use]
pub fn points_for_percentage(percentage: f64) -> u32 {
    if percentage >= 80.0 {
        50
    } else if percentage >= 60.0 {
        30
    } else if percentage >= 40.0 {
        15
    } else {
        5
    }
}

/// Streak after completing a quiz on `today`.
///
/// Same day keeps the streak, the day after extends it, anything else
/// (including no previous quiz) restarts it at one.
#[must_use]
pub fn next_streak(streak: u32, last_quiz_date: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_quiz_date {
        Some(last) if last == today => streak,
        Some(last) if today.pred_opt() == Some(last) => streak.saturating_add(1),
        _ => 1,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn running_average(previous_average: u32, previous_count: u32, percentage: f64) -> u32 {
    let total = f64::from(previous_average) * f64::from(previous_count) + percentage;
    let mean = total / (f64::from(previous_count) + 1.0);
    mean.round().max(0.0) as u32
}

//
// ─── QUIZ COMPLETION ──────────────────────────────────────────────────────────
//

/// Raw result handed over by the quiz engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizCompletion {
    pub subject: Subject,
    pub score: u32,
    pub question_count: u32,
}

/// Derived values of a scored quiz plus the updated record.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizOutcome {
    pub score: u32,
    pub question_count: u32,
    pub percentage: f64,
    pub points_earned: u32,
    pub previous_level: u32,
    pub progress: UserProgress,
}

impl QuizOutcome {
    #[must_use]
    pub fn new_level(&self) -> u32 {
        self.progress.level()
    }

    #[must_use]
    pub fn leveled_up(&self) -> bool {
        self.progress.level() > self.previous_level
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn rounded_percentage(&self) -> u32 {
        self.percentage.round() as u32
    }
}

/// Apply a finished quiz to `progress`.
///
/// # Errors
///
/// Returns `LedgerError` if the quiz had no questions or the score is larger
/// than the number of questions.
pub fn record_quiz(
    progress: &UserProgress,
    completion: QuizCompletion,
    today: NaiveDate,
) -> Result<QuizOutcome, LedgerError> {
    let QuizCompletion {
        subject,
        score,
        question_count,
    } = completion;
    if question_count == 0 {
        return Err(LedgerError::NoQuestions);
    }
    if score > question_count {
        return Err(LedgerError::ScoreOutOfRange {
            score,
            question_count,
        });
    }

    let percentage = percentage(score, question_count);
    let points_earned = points_for_percentage(percentage);

    let mut next = progress.clone();
    next.total_points = progress.total_points.saturating_add(points_earned);
    next.level = level_for_points(next.total_points);
    next.streak = next_streak(progress.streak, progress.last_quiz_date, today);
    next.last_quiz_date = Some(today);
    next.quizzes_completed = progress.quizzes_completed.saturating_add(1);

    let bucket = next.subject_progress.entry(subject).or_default();
    bucket.average_score =
        running_average(bucket.average_score, bucket.quizzes_completed, percentage);
    bucket.quizzes_completed = bucket.quizzes_completed.saturating_add(1);
    bucket.points = bucket.points.saturating_add(points_earned);

    Ok(QuizOutcome {
        score,
        question_count,
        percentage,
        points_earned,
        previous_level: progress.level,
        progress: next,
    })
}

//
// ─── FLAT REWARDS ─────────────────────────────────────────────────────────────
//

/// +10 points and one more accepted challenge.
#[must_use]
pub fn record_challenge_accepted(progress: &UserProgress) -> UserProgress {
    let mut next = progress.clone();
    next.total_points = progress.total_points.saturating_add(CHALLENGE_POINTS);
    next.level = level_for_points(next.total_points);
    next.completed_challenges = progress.completed_challenges.saturating_add(1);
    next
}

/// +20 points, credited to the total and to the `stories` bucket.
#[must_use]
pub fn record_story_completed(progress: &UserProgress) -> UserProgress {
    let mut next = progress.clone();
    next.total_points = progress.total_points.saturating_add(STORY_POINTS);
    next.level = level_for_points(next.total_points);
    let stories = next.subject_progress.entry(Subject::Stories).or_default();
    stories.points = stories.points.saturating_add(STORY_POINTS);
    next
}
