use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── SUBJECT ──────────────────────────────────────────────────────────────────
//

/// Top-level learning category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    #[default]
    Explore,
    Science,
    Math,
    Social,
    English,
    Stories,
    Sports,
}

impl Subject {
    pub const ALL: [Subject; 7] = [
        Subject::Explore,
        Subject::Science,
        Subject::Math,
        Subject::Social,
        Subject::English,
        Subject::Stories,
        Subject::Sports,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Explore => "explore",
            Subject::Science => "science",
            Subject::Math => "math",
            Subject::Social => "social",
            Subject::English => "english",
            Subject::Stories => "stories",
            Subject::Sports => "sports",
        }
    }

    /// Suggested topics offered when the learner picks this subject.
    #[must_use]
    pub fn topics(self) -> &'static [&'static str] {
        match self {
            Subject::Explore => &[],
            Subject::Science => &["Plants", "Animals", "Physics", "Chemistry", "Earth"],
            Subject::Math => &["Algebra", "Geometry", "Numbers", "Logic", "Fractions"],
            Subject::Social => &["History", "Geography", "Civics", "Culture", "Economics"],
            Subject::English => &["Grammar", "Vocabulary", "Reading", "Writing", "Comprehension"],
            Subject::Stories => &["Fables", "Fairy Tales", "Adventure", "Moral Stories", "Folk Tales"],
            Subject::Sports => &["Cricket", "Football", "Basketball", "Athletics", "Badminton"],
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {raw}")]
pub struct ParseCatalogError {
    kind: &'static str,
    raw: String,
}

impl FromStr for Subject {
    type Err = ParseCatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Subject::ALL
            .into_iter()
            .find(|subject| subject.as_str() == lowered)
            .ok_or(ParseCatalogError {
                kind: "subject",
                raw: s.to_owned(),
            })
    }
}

//
// ─── LANGUAGE ─────────────────────────────────────────────────────────────────
//

/// Languages the tutor can answer and speak in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Te,
    Ta,
    Kn,
    Ml,
    Gu,
    Bn,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::En,
        Language::Hi,
        Language::Te,
        Language::Ta,
        Language::Kn,
        Language::Ml,
        Language::Gu,
        Language::Bn,
    ];

    /// ISO 639-1 code used on the wire.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Te => "te",
            Language::Ta => "ta",
            Language::Kn => "kn",
            Language::Ml => "ml",
            Language::Gu => "gu",
            Language::Bn => "bn",
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Hi => "Hindi",
            Language::Te => "Telugu",
            Language::Ta => "Tamil",
            Language::Kn => "Kannada",
            Language::Ml => "Malayalam",
            Language::Gu => "Gujarati",
            Language::Bn => "Bengali",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = ParseCatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|language| language.code() == lowered)
            .ok_or(ParseCatalogError {
                kind: "language",
                raw: s.to_owned(),
            })
    }
}
