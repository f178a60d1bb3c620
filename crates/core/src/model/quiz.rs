use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuizId;
use crate::model::wire::{self, Scalar};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz has no valid questions")]
    Empty,

    #[error("question text is empty")]
    EmptyQuestion,

    #[error("question has no options")]
    NoOptions,

    #[error("correct index is not a number")]
    UnusableCorrectIndex,

    #[error("correct index {index} is out of bounds for {len} options")]
    CorrectIndexOutOfBounds { index: i64, len: usize },

    #[error("a quiz attempt is already in progress")]
    AttemptInProgress,
}

//
// ─── QUESTION ATTRIBUTES ──────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// Multiple choice.
    #[default]
    Mcq,
    /// True / false.
    Tf,
}

/// Points a question is worth when the upstream payload does not say.
pub const DEFAULT_QUESTION_POINTS: u32 = 10;

//
// ─── RAW (UPSTREAM) SHAPE ─────────────────────────────────────────────────────
//

/// Answer index as sent upstream: a number, a numeric string, or something
/// unusable such as a letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawIndex {
    Index(i64),
    Unusable,
}

impl From<i64> for RawIndex {
    fn from(index: i64) -> Self {
        RawIndex::Index(index)
    }
}

impl Serialize for RawIndex {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RawIndex::Index(index) => serializer.serialize_i64(*index),
            RawIndex::Unusable => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for RawIndex {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Scalar::deserialize(deserializer)?
            .into_integer()
            .map_or(RawIndex::Unusable, RawIndex::Index))
    }
}

/// Question exactly as an upstream service sends it.
///
/// The content service names the answer index `correctAnswer`, the quiz
/// generator names it `correct`. Both are accepted here and collapsed into a
/// single index by [`Question::from_raw`]; nothing downstream sees either name.
///
/// Fields of the wrong shape decode as absent instead of failing the payload;
/// [`Question::from_raw`] decides whether what is left is usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuestion {
    #[serde(default, deserialize_with = "wire::text")]
    pub question: String,
    #[serde(default, deserialize_with = "option_texts")]
    pub options: Vec<String>,
    #[serde(default, deserialize_with = "wire::lenient_option")]
    pub correct: Option<RawIndex>,
    #[serde(default, deserialize_with = "wire::lenient_option")]
    pub correct_answer: Option<RawIndex>,
    #[serde(default, deserialize_with = "wire::optional_text")]
    pub explanation: Option<String>,
    #[serde(default, deserialize_with = "loose_difficulty")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, deserialize_with = "wire::lenient_option")]
    pub points: Option<u32>,
    #[serde(default, rename = "type", deserialize_with = "loose_kind")]
    pub kind: Option<QuestionKind>,
}

/// Quiz payload as attached to an AI content response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawQuiz {
    #[serde(default, deserialize_with = "wire::optional_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "wire::text")]
    pub topic: String,
    #[serde(default, deserialize_with = "wire::lenient_list")]
    pub questions: Vec<RawQuestion>,
}

/// Option texts, all or nothing: dropping one entry would shift the answer
/// index onto the wrong option.
fn option_texts<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let items: Option<Vec<Scalar>> = wire::lenient_option(deserializer)?;
    Ok(items
        .and_then(|items| items.into_iter().map(Scalar::into_text).collect())
        .unwrap_or_default())
}

/// Lower-cased letters and digits only, so `True/False` and `true_false`
/// compare equal.
fn squash(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn loose_kind<'de, D>(deserializer: D) -> Result<Option<QuestionKind>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let text = wire::optional_text(deserializer)?;
    Ok(text.and_then(|text| match squash(&text).as_str() {
        "mcq" | "multiplechoice" | "choice" => Some(QuestionKind::Mcq),
        "tf" | "truefalse" | "boolean" => Some(QuestionKind::Tf),
        _ => None,
    }))
}

fn loose_difficulty<'de, D>(deserializer: D) -> Result<Option<Difficulty>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let text = wire::optional_text(deserializer)?;
    Ok(text.and_then(|text| match squash(&text).as_str() {
        "easy" => Some(Difficulty::Easy),
        "medium" => Some(Difficulty::Medium),
        "hard" => Some(Difficulty::Hard),
        _ => None,
    }))
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A validated question. `correct_index` always addresses an existing option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    question: String,
    options: Vec<String>,
    correct_index: usize,
    explanation: Option<String>,
    difficulty: Difficulty,
    points: u32,
    kind: QuestionKind,
}

impl Question {
    /// Build a question, checking that the correct index addresses an option.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` when the text is blank, there are no options, or
    /// the index is out of bounds.
    pub fn new(
        question: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        kind: QuestionKind,
    ) -> Result<Self, QuizError> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(QuizError::EmptyQuestion);
        }
        if options.is_empty() {
            return Err(QuizError::NoOptions);
        }
        if correct_index >= options.len() {
            return Err(QuizError::CorrectIndexOutOfBounds {
                index: i64::try_from(correct_index).unwrap_or(i64::MAX),
                len: options.len(),
            });
        }
        Ok(Self {
            question,
            options,
            correct_index,
            explanation: None,
            difficulty: Difficulty::default(),
            points: DEFAULT_QUESTION_POINTS,
            kind,
        })
    }

    /// Canonicalize an upstream question.
    ///
    /// `correct` wins over `correctAnswer`; when both are missing the first
    /// option is taken as correct. An index that is not a number rejects the
    /// question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the question cannot be made valid.
    pub fn from_raw(raw: RawQuestion) -> Result<Self, QuizError> {
        let index = match raw.correct.or(raw.correct_answer) {
            None => 0,
            Some(RawIndex::Index(index)) => index,
            Some(RawIndex::Unusable) => return Err(QuizError::UnusableCorrectIndex),
        };
        let len = raw.options.len();
        let correct_index = usize::try_from(index)
            .map_err(|_| QuizError::CorrectIndexOutOfBounds { index, len })?;

        let mut question = Self::new(
            raw.question,
            raw.options,
            correct_index,
            raw.kind.unwrap_or_default(),
        )?;
        question.explanation = raw.explanation.filter(|text| !text.trim().is_empty());
        question.difficulty = raw.difficulty.unwrap_or_default();
        question.points = raw.points.unwrap_or(DEFAULT_QUESTION_POINTS);
        Ok(question)
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn is_correct(&self, answer: usize) -> bool {
        answer == self.correct_index
    }
}

//
// ─── QUIZ ─────────────────────────────────────────────────────────────────────
//

/// A non-empty, validated set of questions about one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quiz {
    id: QuizId,
    topic: String,
    questions: Vec<Question>,
}

impl Quiz {
    /// # Errors
    ///
    /// Returns `QuizError::Empty` when `questions` is empty.
    pub fn new(
        id: QuizId,
        topic: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::Empty);
        }
        Ok(Self {
            id,
            topic: topic.into(),
            questions,
        })
    }

    /// Normalize upstream questions, dropping the ones that cannot be repaired.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Empty` if no question survives normalization.
    pub fn from_raw_questions(
        id: QuizId,
        topic: impl Into<String>,
        raw: impl IntoIterator<Item = RawQuestion>,
    ) -> Result<Self, QuizError> {
        let questions = raw
            .into_iter()
            .filter_map(|question| Question::from_raw(question).ok())
            .collect();
        Self::new(id, topic, questions)
    }

    /// # Errors
    ///
    /// Returns `QuizError::Empty` if no question survives normalization.
    pub fn from_raw(raw: RawQuiz) -> Result<Self, QuizError> {
        let id = raw.id.map_or_else(QuizId::generate, QuizId::new);
        Self::from_raw_questions(id, raw.topic, raw.questions)
    }

    /// The two canned questions used when quiz generation is unavailable.
    #[must_use]
    pub fn offline_fallback(topic: &str) -> Self {
        let letters = ["A", "B", "C", "D"].map(String::from).to_vec();
        let true_false = ["True", "False"].map(String::from).to_vec();
        let questions = vec![
            Question {
                question: format!("Sample question 1 about {topic}"),
                options: letters,
                correct_index: 0,
                explanation: None,
                difficulty: Difficulty::default(),
                points: DEFAULT_QUESTION_POINTS,
                kind: QuestionKind::Mcq,
            },
            Question {
                question: format!("Sample question 2 about {topic}"),
                options: true_false,
                correct_index: 1,
                explanation: None,
                difficulty: Difficulty::default(),
                points: DEFAULT_QUESTION_POINTS,
                kind: QuestionKind::Tf,
            },
        ];
        Self {
            id: QuizId::generate(),
            topic: topic.to_owned(),
            questions,
        }
    }

    #[must_use]
    pub fn id(&self) -> &QuizId {
        &self.id
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always false; kept for the `len`/`is_empty` pairing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn into_questions(self) -> Vec<Question> {
        self.questions
    }
}

/// Short pointer to a quiz attached to a bot message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPrompt {
    pub topic: String,
    pub quiz_id: QuizId,
}

impl QuizPrompt {
    #[must_use]
    pub fn for_quiz(quiz: &Quiz) -> Self {
        Self {
            topic: quiz.topic().to_owned(),
            quiz_id: quiz.id().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawQuestion {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn numeric_quiz_ids_are_kept_as_text() {
        let quiz: RawQuiz = serde_json::from_str(
            r#"{"id":1718000000000,"topic":"Space","questions":[{"question":"Q","options":["a"]}]}"#,
        )
        .unwrap();
        assert_eq!(quiz.id.as_deref(), Some("1718000000000"));
        assert_eq!(Quiz::from_raw(quiz).unwrap().id().as_str(), "1718000000000");
    }

    #[test]
    fn correct_answer_field_is_canonicalized() {
        let q = Question::from_raw(raw(
            r#"{"question":"2+2?","options":["3","4"],"correctAnswer":1,"difficulty":"easy","points":5}"#,
        ))
        .unwrap();
        assert_eq!(q.correct_index(), 1);
        assert_eq!(q.difficulty(), Difficulty::Easy);
        assert_eq!(q.points(), 5);
    }

    #[test]
    fn correct_field_is_canonicalized_and_kind_read() {
        let q = Question::from_raw(raw(
            r#"{"question":"Sky is blue","options":["True","False"],"correct":0,"type":"tf"}"#,
        ))
        .unwrap();
        assert_eq!(q.correct_index(), 0);
        assert_eq!(q.kind(), QuestionKind::Tf);
        assert_eq!(q.points(), DEFAULT_QUESTION_POINTS);
    }

    #[test]
    fn missing_index_defaults_to_first_option() {
        let q = Question::from_raw(raw(r#"{"question":"Pick","options":["a","b"]}"#)).unwrap();
        assert_eq!(q.correct_index(), 0);
    }

    #[test]
    fn out_of_bounds_and_negative_indices_are_rejected() {
        let err = Question::from_raw(raw(r#"{"question":"Q","options":["a"],"correct":3}"#))
            .unwrap_err();
        assert_eq!(err, QuizError::CorrectIndexOutOfBounds { index: 3, len: 1 });

        let err = Question::from_raw(raw(r#"{"question":"Q","options":["a"],"correct":-1}"#))
            .unwrap_err();
        assert!(matches!(err, QuizError::CorrectIndexOutOfBounds { index: -1, .. }));
    }

    #[test]
    fn invalid_questions_are_excluded_from_quiz() {
        let quiz = Quiz::from_raw_questions(
            QuizId::new("q"),
            "Plants",
            vec![
                raw(r#"{"question":"Good","options":["a","b"],"correct":1}"#),
                raw(r#"{"question":"Bad","options":["a","b"],"correct":7}"#),
                raw(r#"{"question":"","options":["a"]}"#),
            ],
        )
        .unwrap();
        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz.questions()[0].question(), "Good");
    }

    #[test]
    fn quiz_without_questions_is_rejected_at_creation() {
        assert_eq!(
            Quiz::new(QuizId::new("x"), "t", Vec::new()).unwrap_err(),
            QuizError::Empty
        );
        let all_bad = vec![raw(r#"{"question":"Q","options":[]}"#)];
        assert_eq!(
            Quiz::from_raw_questions(QuizId::new("x"), "t", all_bad).unwrap_err(),
            QuizError::Empty
        );
    }

    #[test]
    fn offline_fallback_mentions_topic() {
        let quiz = Quiz::offline_fallback("Volcanoes");
        assert_eq!(quiz.len(), 2);
        assert_eq!(quiz.topic(), "Volcanoes");
        assert_eq!(quiz.questions()[0].question(), "Sample question 1 about Volcanoes");
        assert_eq!(quiz.questions()[0].options().len(), 4);
        assert_eq!(quiz.questions()[1].question(), "Sample question 2 about Volcanoes");
        assert_eq!(quiz.questions()[1].correct_index(), 1);
        assert_eq!(quiz.questions()[1].kind(), QuestionKind::Tf);
    }

    #[test]
    fn loosely_typed_fields_do_not_sink_the_payload() {
        let payload = r#"{
            "id": 99,
            "topic": "Birds",
            "questions": [
                {"question":"Can penguins fly?","options":["Yes","No"],"correct":"1","type":"True/False"},
                {"question":"Which is a bird?","options":["Owl","Cat"],"correct":"b"},
                {"question":"Eggs?","options":["Yes","No"],"correctAnswer":0.0,"difficulty":"EASY","points":"lots"},
                {"question":"Mixed","options":["a",{"x":1}]},
                "not a question"
            ]
        }"#;
        let quiz = Quiz::from_raw(serde_json::from_str(payload).unwrap()).unwrap();
        assert_eq!(quiz.id().as_str(), "99");
        assert_eq!(quiz.len(), 2);

        let penguins = &quiz.questions()[0];
        assert_eq!(penguins.correct_index(), 1);
        assert_eq!(penguins.kind(), QuestionKind::Tf);

        let eggs = &quiz.questions()[1];
        assert_eq!(eggs.correct_index(), 0);
        assert_eq!(eggs.difficulty(), Difficulty::Easy);
        assert_eq!(eggs.points(), DEFAULT_QUESTION_POINTS);
    }

    #[test]
    fn letter_answer_index_rejects_the_question() {
        let err = Question::from_raw(raw(r#"{"question":"Q","options":["a","b"],"correct":"b"}"#))
            .unwrap_err();
        assert_eq!(err, QuizError::UnusableCorrectIndex);
    }

    #[test]
    fn unknown_question_type_falls_back_to_multiple_choice() {
        let q = Question::from_raw(raw(r#"{"question":"Q","options":["a","b"],"type":"essay"}"#))
            .unwrap();
        assert_eq!(q.kind(), QuestionKind::Mcq);
    }

    #[test]
    fn raw_quiz_from_content_service_payload() {
        let payload = r#"{
            "id": "1712",
            "topic": "Volcanoes",
            "questions": [
                {"question":"Hot?","options":["yes","no"],"correctAnswer":0,
                 "explanation":"Lava is hot.","difficulty":"medium","points":10}
            ]
        }"#;
        let quiz = Quiz::from_raw(serde_json::from_str(payload).unwrap()).unwrap();
        assert_eq!(quiz.id(), &QuizId::new("1712"));
        assert_eq!(quiz.questions()[0].explanation(), Some("Lava is hot."));
        assert_eq!(QuizPrompt::for_quiz(&quiz).topic, "Volcanoes");
    }
}
