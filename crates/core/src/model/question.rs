use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{PlayerId, QuestionId};
use crate::model::settings::Difficulty;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question has no correct answer")]
    MissingAnswer,

    #[error("multiple-choice question has no choices")]
    MissingChoices,

    #[error("unknown question kind: {0}")]
    UnknownKind(String),
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    #[default]
    MultipleChoice,
    DirectAnswer,
    ReadingComprehension,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple-choice",
            QuestionKind::DirectAnswer => "direct-answer",
            QuestionKind::ReadingComprehension => "reading-comprehension",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "multiple-choice" => Ok(QuestionKind::MultipleChoice),
            "direct-answer" => Ok(QuestionKind::DirectAnswer),
            "reading-comprehension" => Ok(QuestionKind::ReadingComprehension),
            _ => Err(QuestionError::UnknownKind(s.to_string())),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Unvalidated question as received from a provider.
#[derive(Debug, Clone, Default)]
pub struct QuestionDraft {
    pub id: Option<QuestionId>,
    pub text: String,
    pub choices: Option<Vec<String>>,
    pub answer: String,
    pub passage: Option<String>,
    pub kind: QuestionKind,
    pub subject: String,
    pub sub_activity: String,
    pub difficulty: Difficulty,
}

impl QuestionDraft {
    /// Validate the draft and bind it to its owner.
    ///
    /// Choices are kept only for multiple-choice questions and the passage only
    /// for reading-comprehension questions. A missing id gets a random one.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if text or answer are blank, or a
    /// multiple-choice question has no choices.
    pub fn validate(self, owner: PlayerId) -> Result<Question, QuestionError> {
        let text = self.text.trim().to_string();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        let answer = self.answer.trim().to_string();
        if answer.is_empty() {
            return Err(QuestionError::MissingAnswer);
        }

        let choices = match self.kind {
            QuestionKind::MultipleChoice => {
                let choices: Vec<String> = self
                    .choices
                    .unwrap_or_default()
                    .into_iter()
                    .map(|choice| choice.trim().to_string())
                    .filter(|choice| !choice.is_empty())
                    .collect();
                if choices.is_empty() {
                    return Err(QuestionError::MissingChoices);
                }
                Some(choices)
            }
            QuestionKind::DirectAnswer | QuestionKind::ReadingComprehension => None,
        };

        let passage = match self.kind {
            QuestionKind::ReadingComprehension => self
                .passage
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            QuestionKind::MultipleChoice | QuestionKind::DirectAnswer => None,
        };

        Ok(Question {
            id: self.id.unwrap_or_else(QuestionId::random),
            text,
            choices,
            answer,
            passage,
            kind: self.kind,
            subject: self.subject.trim().to_string(),
            sub_activity: self.sub_activity.trim().to_string(),
            difficulty: self.difficulty,
            owner,
        })
    }
}

/// A question assigned to a session. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    choices: Option<Vec<String>>,
    answer: String,
    passage: Option<String>,
    kind: QuestionKind,
    subject: String,
    sub_activity: String,
    difficulty: Difficulty,
    owner: PlayerId,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Present only for multiple-choice questions.
    #[must_use]
    pub fn choices(&self) -> Option<&[String]> {
        self.choices.as_deref()
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Present only for reading-comprehension questions.
    #[must_use]
    pub fn passage(&self) -> Option<&str> {
        self.passage.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn sub_activity(&self) -> &str {
        &self.sub_activity
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn owner(&self) -> PlayerId {
        self.owner
    }
}
