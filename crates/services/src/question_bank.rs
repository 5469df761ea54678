use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::rng;
use rand::seq::SliceRandom;
use serde_json::Value;
use tracing::debug;

use quiz_core::model::{PlayerId, Question, QuestionDraft, QuestionId, QuestionKind, Settings};

use crate::collaborators::{AnswerSubmitter, QuestionProvider, SubmitVerdict};
use crate::error::{ProviderError, SubmitError};
use crate::evaluator::answers_match;

/// One canned question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankEntry {
    pub subject: &'static str,
    pub sub_activity: &'static str,
    pub text: &'static str,
    pub choices: &'static [&'static str],
    pub answer: &'static str,
    pub passage: Option<&'static str>,
    pub kind: QuestionKind,
}

const fn choice(
    subject: &'static str,
    sub_activity: &'static str,
    text: &'static str,
    choices: &'static [&'static str],
    answer: &'static str,
) -> BankEntry {
    BankEntry {
        subject,
        sub_activity,
        text,
        choices,
        answer,
        passage: None,
        kind: QuestionKind::MultipleChoice,
    }
}

const BUILTIN: &[BankEntry] = &[
    choice("Math", "Addition/Subtraction", "What is 5 + 3?", &["7", "8", "9", "10"], "8"),
    choice("Math", "Multiplication/Division", "What is 2 × 3?", &["4", "5", "6", "7"], "6"),
    choice(
        "Math",
        "Word Problems",
        "Tom has 3 apples. Sarah has 4 apples. How many apples do they have together?",
        &["5", "6", "7", "8"],
        "7",
    ),
    choice(
        "Math",
        "Mushroom Kingdom Calculations",
        "Mario collected 5 coins in World 1-1 and then 3 more coins in World 1-2. How many coins does he have in total?",
        &["5", "8", "10", "12"],
        "8",
    ),
    choice(
        "Math",
        "Fractions",
        "What fraction of the circle is shaded if 2 out of 4 equal parts are shaded?",
        &["1/4", "1/2", "2/3", "3/4"],
        "1/2",
    ),
    choice(
        "Math",
        "Time",
        "If it's 3:00 now, what time will it be in 2 hours?",
        &["4:00", "5:00", "6:00", "7:00"],
        "5:00",
    ),
    choice("Math", "Money", "How many cents are in a quarter?", &["5", "10", "25", "50"], "25"),
    BankEntry {
        subject: "English",
        sub_activity: "Reading Comprehension",
        text: "What color is Sara's dog?",
        choices: &[],
        answer: "Brown",
        passage: Some("Sara has a dog. Her dog is brown. The dog likes to play in the park."),
        kind: QuestionKind::ReadingComprehension,
    },
    BankEntry {
        subject: "English",
        sub_activity: "Grammar Correction",
        text: "The boy play with toys.",
        choices: &[],
        answer: "The boy plays with toys.",
        passage: None,
        kind: QuestionKind::DirectAnswer,
    },
    choice(
        "English",
        "Spelling",
        "Which word is spelled correctly?",
        &["hapen", "happn", "happen", "hapenn"],
        "happen",
    ),
    choice(
        "English",
        "Vocabulary",
        "What is the meaning of 'happy'?",
        &["Sad", "Angry", "Joyful", "Tired"],
        "Joyful",
    ),
    choice(
        "English",
        "Synonyms/Antonyms",
        "What is the opposite of 'hot'?",
        &["Warm", "Cold", "Cool", "Freezing"],
        "Cold",
    ),
    choice(
        "English",
        "Opposites/Antonyms",
        "What is the opposite of 'big'?",
        &["Large", "Small", "Huge", "Giant"],
        "Small",
    ),
    choice("Science", "Animals", "Which animal lives in water?", &["Dog", "Cat", "Fish", "Bird"], "Fish"),
    choice("Science", "Plants", "What do plants need to grow?", &["Rocks", "Water", "Sand", "Toys"], "Water"),
    choice(
        "Science",
        "Weather",
        "What comes from clouds when it rains?",
        &["Sunshine", "Snow", "Water", "Wind"],
        "Water",
    ),
    choice(
        "Science",
        "Seasons",
        "In which season do leaves fall from trees?",
        &["Spring", "Summer", "Fall", "Winter"],
        "Fall",
    ),
];

/// The one multiple-choice question a player may still submit.
#[derive(Debug, Clone)]
struct Outstanding {
    question_id: QuestionId,
    answer: String,
}

/// Offline question source and exact-answer judge.
///
/// Unknown activities fall back to the subject's first entry, and unknown
/// subjects to the first entry overall. Only the latest multiple-choice
/// question issued to a player can be submitted; issuing another question
/// to that player supersedes it. Free-text questions are never remembered
/// since they are judged without a submit.
pub struct QuestionBank {
    entries: Vec<BankEntry>,
    shuffle_choices: bool,
    issued: Mutex<HashMap<PlayerId, Outstanding>>,
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::builtin()
    }
}

impl QuestionBank {
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(BUILTIN.to_vec())
    }

    #[must_use]
    pub fn new(entries: Vec<BankEntry>) -> Self {
        Self {
            entries,
            shuffle_choices: true,
            issued: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle_choices = shuffle;
        self
    }

    #[must_use]
    pub fn entries(&self) -> &[BankEntry] {
        &self.entries
    }

    fn pick(&self, subject: &str, sub_activity: &str) -> Option<&BankEntry> {
        let in_subject = |e: &&BankEntry| e.subject.eq_ignore_ascii_case(subject);
        self.entries
            .iter()
            .filter(in_subject)
            .find(|e| e.sub_activity.eq_ignore_ascii_case(sub_activity))
            .or_else(|| self.entries.iter().find(in_subject))
            .or_else(|| self.entries.first())
    }
}

#[async_trait]
impl QuestionProvider for QuestionBank {
    async fn fetch_question(
        &self,
        player_id: PlayerId,
        settings: &Settings,
    ) -> Result<Question, ProviderError> {
        let entry = self
            .pick(settings.subject(), settings.sub_activity())
            .ok_or_else(|| ProviderError::Exhausted {
                subject: settings.subject().to_string(),
                sub_activity: settings.sub_activity().to_string(),
            })?;

        let mut choices: Vec<String> = entry.choices.iter().map(|c| (*c).to_string()).collect();
        if self.shuffle_choices {
            let mut rng = rng();
            choices.as_mut_slice().shuffle(&mut rng);
        }

        let question = QuestionDraft {
            id: None,
            text: entry.text.to_string(),
            choices: Some(choices),
            answer: entry.answer.to_string(),
            passage: entry.passage.map(str::to_string),
            kind: entry.kind,
            subject: entry.subject.to_string(),
            sub_activity: entry.sub_activity.to_string(),
            difficulty: settings.difficulty(),
        }
        .validate(player_id)?;

        let mut issued = self
            .issued
            .lock()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        if question.kind() == QuestionKind::MultipleChoice {
            issued.insert(
                player_id,
                Outstanding {
                    question_id: question.id().clone(),
                    answer: question.answer().to_string(),
                },
            );
        } else {
            issued.remove(&player_id);
        }
        drop(issued);
        debug!(player_id = %player_id, question_id = %question.id(), "question issued from bank");
        Ok(question)
    }
}

#[async_trait]
impl AnswerSubmitter for QuestionBank {
    async fn submit_answer(
        &self,
        player_id: PlayerId,
        question_id: &QuestionId,
        answer: &str,
    ) -> Result<SubmitVerdict, SubmitError> {
        let expected = {
            let Ok(mut issued) = self.issued.lock() else {
                return Err(SubmitError::UnknownQuestion(question_id.to_string()));
            };
            let current = issued
                .get(&player_id)
                .is_some_and(|outstanding| &outstanding.question_id == question_id);
            if current {
                issued.remove(&player_id).map(|outstanding| outstanding.answer)
            } else {
                None
            }
        }
        .ok_or_else(|| SubmitError::UnknownQuestion(question_id.to_string()))?;
        Ok(SubmitVerdict {
            is_correct: Value::Bool(answers_match(answer, &expected)),
            correct_answer: Some(expected),
            message: None,
        })
    }
}
