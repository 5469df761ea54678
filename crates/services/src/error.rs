//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{PlayerError, PlayerId, QuestionError, SettingsError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by a `QuestionProvider`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("question request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("provider returned an unusable question: {0}")]
    InvalidQuestion(#[from] QuestionError),
    #[error("question source unavailable: {0}")]
    Unavailable(String),
    #[error("no questions available for {subject} / {sub_activity}")]
    Exhausted {
        subject: String,
        sub_activity: String,
    },
}

/// Errors emitted by an `AnswerSubmitter`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmitError {
    #[error("submit request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unknown question id: {0}")]
    UnknownQuestion(String),
    #[error("submit response has a non-boolean is_correct: {0}")]
    MalformedVerdict(String),
}

/// Errors emitted by a `FreeTextEvaluator`. The router absorbs these.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvaluationError {
    #[error("evaluation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("evaluation response has a non-boolean is_correct: {0}")]
    MalformedVerdict(String),
    #[error("free-text evaluation is not available")]
    Unavailable,
}

/// Errors surfaced by `GameSession` actions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no player selected")]
    NoPlayer,
    #[error("could not load a question: {0}")]
    ProviderUnavailable(#[source] ProviderError),
    #[error("could not submit the answer: {0}")]
    SubmitFailed(#[source] SubmitError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Errors emitted by `PlayerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlayerServiceError {
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error("a player with that name already exists")]
    DuplicateName,
    #[error("player {0} not found")]
    NotFound(PlayerId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors produced while reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("{var} must use http or https, got {scheme}")]
    UnsupportedScheme { var: &'static str, scheme: String },
    #[error("{var} has an invalid value: {raw}")]
    InvalidValue { var: &'static str, raw: String },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
