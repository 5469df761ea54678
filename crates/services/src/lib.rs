#![forbid(unsafe_code)]

pub mod app_services;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod http_backend;
pub mod player_service;
pub mod question_bank;
pub mod sessions;

pub use quiz_core::Clock;

pub use app_services::{AppServices, BackendKind};
pub use config::QuizConfig;
pub use error::{
    AppServicesError, ConfigError, EvaluationError, PlayerServiceError, ProviderError,
    SessionError, SubmitError,
};
pub use evaluator::EvaluatorRouter;
pub use http_backend::HttpBackend;
pub use player_service::PlayerService;
pub use question_bank::QuestionBank;
pub use sessions::{GameSession, Outcome, SessionOptions, SessionSnapshot, SessionStatus};
