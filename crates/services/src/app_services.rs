use std::sync::Arc;

use tracing::info;

use quiz_core::model::ActivityRegistry;
use storage::repository::Storage;

use crate::Clock;
use crate::collaborators::{AnswerSubmitter, FreeTextEvaluator, NoFreeTextEvaluator, QuestionProvider};
use crate::config::QuizConfig;
use crate::error::AppServicesError;
use crate::evaluator::EvaluatorRouter;
use crate::http_backend::HttpBackend;
use crate::player_service::PlayerService;
use crate::question_bank::QuestionBank;
use crate::sessions::{GameSession, SessionOptions};

/// Where questions and verdicts come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Http,
    Offline,
}

/// Assembles app-facing services from configuration.
#[derive(Clone)]
pub struct AppServices {
    config: QuizConfig,
    registry: Arc<ActivityRegistry>,
    players: Arc<PlayerService>,
    provider: Arc<dyn QuestionProvider>,
    router: EvaluatorRouter,
    backend: BackendKind,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or HTTP client
    /// setup fails.
    pub async fn new_sqlite(config: QuizConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        Self::with_storage(config, clock, &storage)
    }

    /// Build services over an existing `Storage`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Http` if the HTTP client cannot be built.
    pub fn with_storage(
        config: QuizConfig,
        clock: Clock,
        storage: &Storage,
    ) -> Result<Self, AppServicesError> {
        let registry = Arc::new(ActivityRegistry::builtin());
        let players = Arc::new(PlayerService::new(clock, Arc::clone(&storage.players)));

        let (provider, submitter, free_text, backend) = match config.api_base_url.as_ref() {
            Some(base_url) => {
                let http = Arc::new(HttpBackend::new(
                    base_url,
                    config.request_timeout,
                    Arc::clone(&registry),
                )?);
                info!(base_url = %base_url, "using quiz backend");
                let provider: Arc<dyn QuestionProvider> = http.clone();
                let submitter: Arc<dyn AnswerSubmitter> = http.clone();
                let free_text: Arc<dyn FreeTextEvaluator> = http;
                (provider, submitter, free_text, BackendKind::Http)
            }
            None => {
                let bank = Arc::new(QuestionBank::builtin());
                info!("using offline question bank");
                let provider: Arc<dyn QuestionProvider> = bank.clone();
                let submitter: Arc<dyn AnswerSubmitter> = bank;
                let free_text: Arc<dyn FreeTextEvaluator> = Arc::new(NoFreeTextEvaluator);
                (provider, submitter, free_text, BackendKind::Offline)
            }
        };

        let router = EvaluatorRouter::new(Arc::clone(&registry), submitter, free_text);

        Ok(Self {
            config,
            registry,
            players,
            provider,
            router,
            backend,
        })
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> Arc<ActivityRegistry> {
        Arc::clone(&self.registry)
    }

    #[must_use]
    pub fn players(&self) -> Arc<PlayerService> {
        Arc::clone(&self.players)
    }

    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// A fresh session using the configured options.
    #[must_use]
    pub fn new_session(&self) -> GameSession {
        self.new_session_with(SessionOptions::from_config(&self.config))
    }

    #[must_use]
    pub fn new_session_with(&self, options: SessionOptions) -> GameSession {
        GameSession::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.provider),
            self.router.clone(),
            options,
        )
    }
}
