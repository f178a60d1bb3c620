//! Quiz attempt state machine.
//!
//! `Idle -> Active(i) -> Feedback(i) -> Active(i + 1) | Complete`.
//!
//! The engine does not own a timer. Whoever drives it decides when the
//! feedback dwell is over and calls [`QuizEngine::advance`].

use crate::model::{Question, Quiz, QuizError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Idle,
    Active { index: usize },
    Feedback { index: usize },
    Complete { score: u32 },
}

/// Outcome of accepting an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub question_index: usize,
    pub selected: usize,
    pub correct: bool,
    /// Shown to the learner when they picked a wrong option.
    pub correct_index: usize,
}

impl AnswerFeedback {
    #[must_use]
    pub fn revealed_correct_index(&self) -> Option<usize> {
        (!self.correct).then_some(self.correct_index)
    }
}

/// What happened once the feedback dwell ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next { index: usize },
    Complete { score: u32, question_count: u32 },
}

/// State of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRunState {
    quiz: Quiz,
    current_index: usize,
    correct_count: u32,
    selected_answer: Option<usize>,
    feedback_visible: bool,
    complete: bool,
}

impl QuizRunState {
    fn new(quiz: Quiz) -> Self {
        Self {
            quiz,
            current_index: 0,
            correct_count: 0,
            selected_answer: None,
            feedback_visible: false,
            complete: false,
        }
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn selected_answer(&self) -> Option<usize> {
        self.selected_answer
    }

    #[must_use]
    pub fn feedback_visible(&self) -> bool {
        self.feedback_visible
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.quiz.len()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.complete {
            return None;
        }
        self.quiz.questions().get(self.current_index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizEngine {
    run: Option<QuizRunState>,
}

impl QuizEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        match &self.run {
            None => QuizPhase::Idle,
            Some(run) if run.complete => QuizPhase::Complete {
                score: run.correct_count,
            },
            Some(run) if run.feedback_visible => QuizPhase::Feedback {
                index: run.current_index,
            },
            Some(run) => QuizPhase::Active {
                index: run.current_index,
            },
        }
    }

    #[must_use]
    pub fn run(&self) -> Option<&QuizRunState> {
        self.run.as_ref()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.run.is_none()
    }

    /// Begin an attempt. Only allowed from `Idle`.
    ///
    /// Quizzes are non-empty by construction, so the first question exists.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AttemptInProgress` unless the engine is idle.
    pub fn start(&mut self, quiz: Quiz) -> Result<(), QuizError> {
        if self.run.is_some() {
            return Err(QuizError::AttemptInProgress);
        }
        self.run = Some(QuizRunState::new(quiz));
        Ok(())
    }

    /// Drop the current attempt, whatever its phase.
    pub fn reset(&mut self) -> Option<QuizRunState> {
        self.run.take()
    }

    /// Accept an answer for the current question.
    ///
    /// Returns `None`, leaving the state untouched, when no question is
    /// awaiting an answer (idle, feedback already showing, complete) or when
    /// `index` does not address an option.
    pub fn submit_answer(&mut self, index: usize) -> Option<AnswerFeedback> {
        let run = self.run.as_mut()?;
        if run.complete || run.selected_answer.is_some() {
            return None;
        }
        let question = run.quiz.questions().get(run.current_index)?;
        if index >= question.options().len() {
            return None;
        }

        let correct = question.is_correct(index);
        let correct_index = question.correct_index();
        run.selected_answer = Some(index);
        run.feedback_visible = true;
        if correct {
            run.correct_count += 1;
        }

        Some(AnswerFeedback {
            question_index: run.current_index,
            selected: index,
            correct,
            correct_index,
        })
    }

    /// Leave `Feedback`: move to the next question or complete the attempt.
    ///
    /// Returns `None` outside of the feedback phase.
    pub fn advance(&mut self) -> Option<Advance> {
        let run = self.run.as_mut()?;
        if run.complete || !run.feedback_visible {
            return None;
        }
        run.feedback_visible = false;
        run.selected_answer = None;

        if run.current_index + 1 < run.quiz.len() {
            run.current_index += 1;
            return Some(Advance::Next {
                index: run.current_index,
            });
        }

        run.complete = true;
        Some(Advance::Complete {
            score: run.correct_count,
            question_count: u32::try_from(run.quiz.len()).unwrap_or(u32::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionKind, QuizId};

    fn quiz(n: usize) -> Quiz {
        let questions = (0..n)
            .map(|i| {
                Question::new(
                    format!("Q{i}"),
                    vec!["a".into(), "b".into(), "c".into()],
                    i % 3,
                    QuestionKind::Mcq,
                )
                .unwrap()
            })
            .collect();
        Quiz::new(QuizId::new("t"), "Topic", questions).unwrap()
    }

    #[test]
    fn walks_through_states() {
        let mut engine = QuizEngine::new();
        assert_eq!(engine.phase(), QuizPhase::Idle);

        engine.start(quiz(2)).unwrap();
        assert_eq!(engine.phase(), QuizPhase::Active { index: 0 });

        let feedback = engine.submit_answer(0).unwrap();
        assert!(feedback.correct);
        assert_eq!(feedback.revealed_correct_index(), None);
        assert_eq!(engine.phase(), QuizPhase::Feedback { index: 0 });

        assert_eq!(engine.advance(), Some(Advance::Next { index: 1 }));
        assert_eq!(engine.run().unwrap().selected_answer(), None);

        let feedback = engine.submit_answer(0).unwrap();
        assert!(!feedback.correct);
        assert_eq!(feedback.revealed_correct_index(), Some(1));

        assert_eq!(
            engine.advance(),
            Some(Advance::Complete {
                score: 1,
                question_count: 2
            })
        );
        assert_eq!(engine.phase(), QuizPhase::Complete { score: 1 });
    }

    #[test]
    fn second_answer_to_same_question_is_a_noop() {
        let mut engine = QuizEngine::new();
        engine.start(quiz(3)).unwrap();
        engine.submit_answer(2).unwrap();
        let before = engine.clone();

        assert_eq!(engine.submit_answer(0), None);
        assert_eq!(engine, before);
    }

    #[test]
    fn out_of_range_answer_is_ignored() {
        let mut engine = QuizEngine::new();
        engine.start(quiz(1)).unwrap();
        assert_eq!(engine.submit_answer(9), None);
        assert_eq!(engine.phase(), QuizPhase::Active { index: 0 });
    }

    #[test]
    fn advance_outside_feedback_is_ignored() {
        let mut engine = QuizEngine::new();
        assert_eq!(engine.advance(), None);
        engine.start(quiz(2)).unwrap();
        assert_eq!(engine.advance(), None);
        assert_eq!(engine.phase(), QuizPhase::Active { index: 0 });
    }

    #[test]
    fn complete_is_terminal_until_reset() {
        let mut engine = QuizEngine::new();
        engine.start(quiz(1)).unwrap();
        engine.submit_answer(0).unwrap();
        engine.advance().unwrap();

        assert_eq!(engine.submit_answer(0), None);
        assert_eq!(engine.advance(), None);
        assert_eq!(engine.start(quiz(1)), Err(QuizError::AttemptInProgress));

        engine.reset();
        assert!(engine.is_idle());
        engine.start(quiz(1)).unwrap();
        assert_eq!(engine.run().unwrap().correct_count(), 0);
    }

    #[test]
    fn score_is_always_within_question_count() {
        for n in 1..6 {
            for pick in 0..3 {
                let mut engine = QuizEngine::new();
                engine.start(quiz(n)).unwrap();
                let result = loop {
                    engine.submit_answer(pick).unwrap();
                    if let Some(Advance::Complete {
                        score,
                        question_count,
                    }) = engine.advance()
                    {
                        break (score, question_count);
                    }
                };
                assert_eq!(result.1 as usize, n);
                assert!(result.0 <= result.1);
            }
        }
    }
}
