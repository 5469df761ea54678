use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use quiz_core::model::{ActivityRegistry, Feedback, PlayerId, Question, QuestionKind};

use crate::collaborators::{AnswerSubmitter, FreeTextEvaluator, FreeTextRequest};
use crate::error::SubmitError;

/// Which collaborator judges a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationRoute {
    Submit,
    FreeText,
}

/// Coerce a loosely typed correctness flag into a strict boolean.
///
/// Accepts JSON booleans, the strings `"true"`/`"false"` in any case with
/// surrounding whitespace, and the integers `1`/`0`.
#[must_use]
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Local comparison used when the free-text evaluator cannot answer.
#[must_use]
pub fn answers_match(user_answer: &str, correct_answer: &str) -> bool {
    user_answer.trim().to_lowercase() == correct_answer.trim().to_lowercase()
}

fn fallback_message(question: &Question, is_correct: bool) -> &'static str {
    let reading = question.passage().is_some()
        || question.kind() == QuestionKind::ReadingComprehension;
    match (reading, is_correct) {
        (true, true) => "Great job! Your answer shows you understood the passage well.",
        (true, false) => "Good try! Take another look at the passage for the answer.",
        (false, true) => "Great job! You fixed the sentence correctly.",
        (false, false) => "Good try! Look carefully at the sentence structure and try again.",
    }
}

/// Sends each answer to the right collaborator and normalizes the verdict
/// into `Feedback`.
#[derive(Clone)]
pub struct EvaluatorRouter {
    registry: Arc<ActivityRegistry>,
    submitter: Arc<dyn AnswerSubmitter>,
    free_text: Arc<dyn FreeTextEvaluator>,
}

impl EvaluatorRouter {
    #[must_use]
    pub fn new(
        registry: Arc<ActivityRegistry>,
        submitter: Arc<dyn AnswerSubmitter>,
        free_text: Arc<dyn FreeTextEvaluator>,
    ) -> Self {
        Self {
            registry,
            submitter,
            free_text,
        }
    }

    /// Multiple-choice always goes through submit; otherwise the activity's
    /// evaluation mode decides.
    #[must_use]
    pub fn route_for(&self, question: &Question) -> EvaluationRoute {
        if question.kind() == QuestionKind::MultipleChoice {
            return EvaluationRoute::Submit;
        }
        if self
            .registry
            .requires_free_text(question.subject(), question.sub_activity())
        {
            EvaluationRoute::FreeText
        } else {
            EvaluationRoute::Submit
        }
    }

    /// Judge `raw_answer` against `question`.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError` when the submit path fails or returns a verdict
    /// that is not a boolean. Free-text failures never surface; they fall back
    /// to a local comparison.
    pub async fn evaluate(
        &self,
        player_id: PlayerId,
        question: &Question,
        raw_answer: &str,
    ) -> Result<Feedback, SubmitError> {
        match self.route_for(question) {
            EvaluationRoute::Submit => self.submit(player_id, question, raw_answer).await,
            EvaluationRoute::FreeText => Ok(self.free_text(question, raw_answer).await),
        }
    }

    async fn submit(
        &self,
        player_id: PlayerId,
        question: &Question,
        raw_answer: &str,
    ) -> Result<Feedback, SubmitError> {
        let verdict = self
            .submitter
            .submit_answer(player_id, question.id(), raw_answer)
            .await?;
        let is_correct = coerce_bool(&verdict.is_correct)
            .ok_or_else(|| SubmitError::MalformedVerdict(verdict.is_correct.to_string()))?;
        debug!(question_id = %question.id(), is_correct, "answer submitted");
        Ok(Feedback::for_question(
            question,
            is_correct,
            verdict.correct_answer,
            verdict.message,
            false,
        ))
    }

    async fn free_text(&self, question: &Question, raw_answer: &str) -> Feedback {
        let request = FreeTextRequest::for_question(question, raw_answer);
        match self.free_text.evaluate_free_text(&request).await {
            Ok(verdict) => match coerce_bool(&verdict.is_correct) {
                Some(is_correct) => {
                    return Feedback::for_question(question, is_correct, None, verdict.feedback, true);
                }
                None => warn!(
                    question_id = %question.id(),
                    is_correct = %verdict.is_correct,
                    "free-text verdict is not a boolean; using local comparison"
                ),
            },
            Err(err) => warn!(
                question_id = %question.id(),
                error = %err,
                "free-text evaluation failed; using local comparison"
            ),
        }

        let is_correct = answers_match(raw_answer, question.answer());
        Feedback::for_question(
            question,
            is_correct,
            None,
            Some(fallback_message(question, is_correct).to_string()),
            false,
        )
    }
}
