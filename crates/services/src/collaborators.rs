//! Contracts for the out-of-process collaborators the session talks to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use quiz_core::model::{PlayerId, Question, QuestionId, QuestionKind, Settings};

use crate::error::{EvaluationError, ProviderError, SubmitError};

/// Raw verdict from the plain submit endpoint.
///
/// `is_correct` is kept as untyped JSON; the evaluator router coerces it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmitVerdict {
    pub is_correct: Value,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default, alias = "feedback")]
    pub message: Option<String>,
}

/// Payload for the free-text evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreeTextRequest {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    /// Kind of the question being judged; picks the endpoint, not sent.
    #[serde(skip)]
    pub kind: QuestionKind,
}

impl FreeTextRequest {
    #[must_use]
    pub fn for_question(question: &Question, user_answer: &str) -> Self {
        Self {
            question: question.text().to_string(),
            user_answer: user_answer.to_string(),
            correct_answer: question.answer().to_string(),
            passage: question.passage().map(str::to_string),
            kind: question.kind(),
        }
    }

    /// Reading questions are judged against their passage, even when the
    /// provider sent none.
    #[must_use]
    pub fn is_reading(&self) -> bool {
        self.passage.is_some() || self.kind == QuestionKind::ReadingComprehension
    }
}

/// Raw verdict from the free-text evaluator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FreeTextVerdict {
    pub is_correct: Value,
    #[serde(default, alias = "feedback_message")]
    pub feedback: Option<String>,
}

#[async_trait]
pub trait QuestionProvider: Send + Sync {
    /// Fetch one question for the player under the given settings.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on transport failure or an unusable payload.
    async fn fetch_question(
        &self,
        player_id: PlayerId,
        settings: &Settings,
    ) -> Result<Question, ProviderError>;
}

#[async_trait]
pub trait AnswerSubmitter: Send + Sync {
    /// Submit an answer for exact evaluation.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError` on transport failure or an unknown question.
    async fn submit_answer(
        &self,
        player_id: PlayerId,
        question_id: &QuestionId,
        answer: &str,
    ) -> Result<SubmitVerdict, SubmitError>;
}

#[async_trait]
pub trait FreeTextEvaluator: Send + Sync {
    /// Judge a free-text answer.
    ///
    /// # Errors
    ///
    /// Returns `EvaluationError` when no verdict could be obtained.
    async fn evaluate_free_text(
        &self,
        request: &FreeTextRequest,
    ) -> Result<FreeTextVerdict, EvaluationError>;
}

/// Evaluator used when no free-text backend is configured; always defers to
/// the local fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFreeTextEvaluator;

#[async_trait]
impl FreeTextEvaluator for NoFreeTextEvaluator {
    async fn evaluate_free_text(
        &self,
        _request: &FreeTextRequest,
    ) -> Result<FreeTextVerdict, EvaluationError> {
        Err(EvaluationError::Unavailable)
    }
}
