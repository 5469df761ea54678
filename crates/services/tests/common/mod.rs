#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;

use quiz_core::model::{
    ActivityRegistry, Difficulty, NewPlayer, Player, PlayerId, Question, QuestionDraft,
    QuestionId, QuestionKind, Settings,
};
use quiz_core::time::fixed_now;
use services::collaborators::{
    AnswerSubmitter, FreeTextEvaluator, NoFreeTextEvaluator, QuestionProvider, SubmitVerdict,
};
use services::{EvaluatorRouter, GameSession, ProviderError, SessionOptions, SubmitError};

pub const RIGHT: &str = "right";
pub const WRONG: &str = "wrong";

/// Optional gate: when closed, calls wait until a permit is released.
#[derive(Default)]
pub struct Gate {
    permits: Option<Semaphore>,
}

impl Gate {
    pub fn closed() -> Self {
        Self {
            permits: Some(Semaphore::new(0)),
        }
    }

    pub fn release(&self, n: usize) {
        if let Some(permits) = &self.permits {
            permits.add_permits(n);
        }
    }

    async fn pass(&self) {
        if let Some(permits) = &self.permits {
            permits.acquire().await.unwrap().forget();
        }
    }
}

/// Hands out numbered questions whose answer is `RIGHT` unless overridden.
pub struct ScriptedProvider {
    registry: ActivityRegistry,
    answer: String,
    filed_under: Option<(String, String)>,
    failures: AtomicU32,
    calls: AtomicU32,
    pub gate: Gate,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            registry: ActivityRegistry::builtin(),
            answer: RIGHT.to_string(),
            filed_under: None,
            failures: AtomicU32::new(0),
            calls: AtomicU32::new(0),
            gate: Gate::default(),
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Gate::closed(),
            ..Self::new()
        }
    }

    pub fn with_answer(mut self, answer: &str) -> Self {
        self.answer = answer.to_string();
        self
    }

    /// File every question under this subject/activity regardless of the request.
    pub fn filed_under(mut self, subject: &str, sub_activity: &str) -> Self {
        self.filed_under = Some((subject.to_string(), sub_activity.to_string()));
        self
    }

    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionProvider for ScriptedProvider {
    async fn fetch_question(
        &self,
        player_id: PlayerId,
        settings: &Settings,
    ) -> Result<Question, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.gate.pass().await;
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| f.checked_sub(1))
            .is_ok()
        {
            return Err(ProviderError::Unavailable("scripted outage".into()));
        }

        let (subject, sub_activity) = self.filed_under.clone().unwrap_or_else(|| {
            (
                settings.subject().to_string(),
                settings.sub_activity().to_string(),
            )
        });
        let kind = if self.registry.requires_free_text(&subject, &sub_activity) {
            QuestionKind::DirectAnswer
        } else {
            QuestionKind::MultipleChoice
        };
        Ok(QuestionDraft {
            id: Some(QuestionId::new(format!("q{n}"))),
            text: format!("Question {n}"),
            choices: Some(vec![self.answer.clone(), WRONG.to_string()]),
            answer: self.answer.clone(),
            passage: None,
            kind,
            subject,
            sub_activity,
            difficulty: settings.difficulty(),
        }
        .validate(player_id)
        .unwrap())
    }
}

/// Judges `RIGHT` as correct; everything else is wrong.
pub struct ScriptedSubmitter {
    failures: AtomicU32,
    calls: AtomicU32,
    pub gate: Gate,
}

impl ScriptedSubmitter {
    pub fn new() -> Self {
        Self {
            failures: AtomicU32::new(0),
            calls: AtomicU32::new(0),
            gate: Gate::default(),
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Gate::closed(),
            ..Self::new()
        }
    }

    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnswerSubmitter for ScriptedSubmitter {
    async fn submit_answer(
        &self,
        _player_id: PlayerId,
        question_id: &QuestionId,
        answer: &str,
    ) -> Result<SubmitVerdict, SubmitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.pass().await;
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| f.checked_sub(1))
            .is_ok()
        {
            return Err(SubmitError::UnknownQuestion(question_id.to_string()));
        }
        Ok(SubmitVerdict {
            is_correct: Value::Bool(answer.trim() == RIGHT),
            correct_answer: None,
            message: None,
        })
    }
}

pub fn player(id: u64, name: &str) -> Player {
    NewPlayer {
        name: name.into(),
        age: 8,
        grade: 3,
        avatar: None,
    }
    .validate(PlayerId::new(id), fixed_now())
    .unwrap()
}

pub fn english_player(id: u64, name: &str) -> Player {
    player(id, name).with_preferences("English", "Grammar Correction", Difficulty::Medium)
}

pub fn manual_options(target_rounds: u32) -> SessionOptions {
    SessionOptions::default()
        .with_target_rounds(target_rounds)
        .with_auto_advance(None)
}

pub fn session_with(
    provider: Arc<ScriptedProvider>,
    submitter: Arc<ScriptedSubmitter>,
    free_text: Arc<dyn FreeTextEvaluator>,
    options: SessionOptions,
) -> GameSession {
    let registry = Arc::new(ActivityRegistry::builtin());
    let router = EvaluatorRouter::new(Arc::clone(&registry), submitter, free_text);
    GameSession::new(registry, provider, router, options)
}

pub fn session(
    provider: Arc<ScriptedProvider>,
    submitter: Arc<ScriptedSubmitter>,
    options: SessionOptions,
) -> GameSession {
    session_with(provider, submitter, Arc::new(NoFreeTextEvaluator), options)
}

/// Let every spawned task run until it blocks. Use with paused time.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
