use serde::{Deserialize, Serialize};

use crate::model::question::Question;

/// Result shown to the player after an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub is_correct: bool,
    pub correct_answer: String,
    pub message: String,
    /// `true` only when the free-text evaluator produced the verdict.
    pub ai_evaluated: bool,
}

impl Feedback {
    /// Build feedback, falling back to the question's answer and a default
    /// message when the evaluator left them blank.
    #[must_use]
    pub fn for_question(
        question: &Question,
        is_correct: bool,
        correct_answer: Option<String>,
        message: Option<String>,
        ai_evaluated: bool,
    ) -> Self {
        let correct_answer = correct_answer
            .map(|answer| answer.trim().to_string())
            .filter(|answer| !answer.is_empty())
            .unwrap_or_else(|| question.answer().to_string());
        let message = message
            .map(|msg| msg.trim().to_string())
            .filter(|msg| !msg.is_empty())
            .unwrap_or_else(|| default_message(is_correct, &correct_answer));
        Self {
            is_correct,
            correct_answer,
            message,
            ai_evaluated,
        }
    }
}

#[must_use]
pub fn default_message(is_correct: bool, correct_answer: &str) -> String {
    if is_correct {
        "Correct! 🎉".to_string()
    } else {
        format!("Oops! The correct answer is: {correct_answer}")
    }
}
