use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use quiz_core::model::{
    ActivityRegistry, Difficulty, PlayerId, Question, QuestionDraft, QuestionId, QuestionKind,
    Settings,
};

use crate::collaborators::{
    AnswerSubmitter, FreeTextEvaluator, FreeTextRequest, FreeTextVerdict, QuestionProvider,
    SubmitVerdict,
};
use crate::error::{EvaluationError, ProviderError, SubmitError};

/// Client for the quiz backend's challenge and evaluation endpoints.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    registry: Arc<ActivityRegistry>,
}

impl HttpBackend {
    /// Build a client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be constructed.
    pub fn new(
        base_url: &Url,
        timeout: Duration,
        registry: Arc<ActivityRegistry>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            registry,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn requested_kind(&self, settings: &Settings) -> QuestionKind {
        if settings
            .sub_activity()
            .eq_ignore_ascii_case("Reading Comprehension")
        {
            QuestionKind::ReadingComprehension
        } else if self
            .registry
            .requires_free_text(settings.subject(), settings.sub_activity())
        {
            QuestionKind::DirectAnswer
        } else {
            QuestionKind::MultipleChoice
        }
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, reqwest::Error> {
        self.client.post(self.endpoint(path)).json(body).send().await
    }
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    player_id: u64,
    subject: &'a str,
    sub_activity: &'a str,
    difficulty: String,
    question_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct QuestionPayload {
    #[serde(default)]
    id: Option<String>,
    question: String,
    #[serde(default)]
    choices: Option<Vec<String>>,
    #[serde(default)]
    passage: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    correct_answer: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    sub_activity: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
}

impl QuestionPayload {
    /// Missing metadata defaults to what was requested.
    fn into_question(self, owner: PlayerId, requested: &Settings) -> Result<Question, ProviderError> {
        let kind = match self.kind.as_deref() {
            Some(raw) => raw.parse::<QuestionKind>()?,
            None if self.choices.as_ref().is_some_and(|c| !c.is_empty()) => {
                QuestionKind::MultipleChoice
            }
            None if self.passage.is_some() => QuestionKind::ReadingComprehension,
            None => QuestionKind::DirectAnswer,
        };
        let difficulty = self
            .difficulty
            .as_deref()
            .and_then(|raw| raw.parse::<Difficulty>().ok())
            .unwrap_or(requested.difficulty());
        let draft = QuestionDraft {
            id: self.id.filter(|id| !id.trim().is_empty()).map(QuestionId::new),
            text: self.question,
            choices: self.choices,
            answer: self.answer.or(self.correct_answer).unwrap_or_default(),
            passage: self.passage,
            kind,
            subject: self
                .subject
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| requested.subject().to_string()),
            sub_activity: self
                .sub_activity
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| requested.sub_activity().to_string()),
            difficulty,
        };
        Ok(draft.validate(owner)?)
    }
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    player_id: u64,
    question_id: &'a str,
    answer: &'a str,
}

//
// ─── COLLABORATOR IMPLS ────────────────────────────────────────────────────────
//

#[async_trait]
impl QuestionProvider for HttpBackend {
    async fn fetch_question(
        &self,
        player_id: PlayerId,
        settings: &Settings,
    ) -> Result<Question, ProviderError> {
        let body = GenerateRequest {
            player_id: player_id.value(),
            subject: settings.subject(),
            sub_activity: settings.sub_activity(),
            difficulty: settings.difficulty().as_str().to_ascii_lowercase(),
            question_type: self.requested_kind(settings).as_str(),
        };
        let response = self.post("challenges/generate", &body).await.map_err(|err| {
            warn!(player_id = %player_id, error = %err, "question request failed");
            err
        })?;
        if !response.status().is_success() {
            warn!(player_id = %player_id, status = %response.status(), "question request rejected");
            return Err(ProviderError::HttpStatus(response.status()));
        }
        let payload: QuestionPayload = response.json().await?;
        let question = payload.into_question(player_id, settings)?;
        debug!(player_id = %player_id, question_id = %question.id(), "question received");
        Ok(question)
    }
}

#[async_trait]
impl AnswerSubmitter for HttpBackend {
    async fn submit_answer(
        &self,
        player_id: PlayerId,
        question_id: &QuestionId,
        answer: &str,
    ) -> Result<SubmitVerdict, SubmitError> {
        let body = SubmitRequest {
            player_id: player_id.value(),
            question_id: question_id.as_str(),
            answer,
        };
        let response = self.post("challenges/submit", &body).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SubmitError::UnknownQuestion(question_id.to_string()));
        }
        if !response.status().is_success() {
            warn!(player_id = %player_id, status = %response.status(), "submit rejected");
            return Err(SubmitError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }
}

fn evaluation_path(request: &FreeTextRequest) -> &'static str {
    if request.is_reading() {
        "reading/evaluate"
    } else {
        "grammar/evaluate"
    }
}

#[async_trait]
impl FreeTextEvaluator for HttpBackend {
    async fn evaluate_free_text(
        &self,
        request: &FreeTextRequest,
    ) -> Result<FreeTextVerdict, EvaluationError> {
        let response = self.post(evaluation_path(request), request).await?;
        if !response.status().is_success() {
            return Err(EvaluationError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }
}
