use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use quiz_core::model::{
    ActivityRegistry, Feedback, Player, PlayerId, Question, Settings, SettingsStore,
    SettingsUpdate,
};
use quiz_core::scoring::{ScoringPolicy, SessionCounters};

use super::snapshot::{Outcome, SessionSnapshot, SessionStatus};
use super::timer::Countdown;
use crate::collaborators::QuestionProvider;
use crate::config::QuizConfig;
use crate::error::SessionError;
use crate::evaluator::EvaluatorRouter;

/// Per-session tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub target_rounds: u32,
    /// `None` means manual advance only.
    pub auto_advance: Option<Duration>,
    pub prefetch: bool,
    pub scoring: ScoringPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&QuizConfig::default())
    }
}

impl SessionOptions {
    #[must_use]
    pub fn from_config(config: &QuizConfig) -> Self {
        Self {
            target_rounds: config.target_rounds.max(1),
            auto_advance: config.auto_advance,
            prefetch: config.prefetch,
            scoring: ScoringPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_target_rounds(mut self, rounds: u32) -> Self {
        self.target_rounds = rounds.max(1);
        self
    }

    #[must_use]
    pub fn with_auto_advance(mut self, delay: Option<Duration>) -> Self {
        self.auto_advance = delay;
        self
    }

    #[must_use]
    pub fn with_prefetch(mut self, prefetch: bool) -> Self {
        self.prefetch = prefetch;
        self
    }

    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringPolicy) -> Self {
        self.scoring = scoring;
        self
    }
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

struct Prefetched {
    token: u64,
    round: u32,
    question: Question,
}

struct SessionState {
    status: SessionStatus,
    player: Option<Player>,
    settings: SettingsStore,
    question: Option<Question>,
    feedback: Option<Feedback>,
    counters: SessionCounters,
    is_fetching_question: bool,
    is_evaluating_answer: bool,
    is_advancing: bool,
    countdown: Option<u32>,
    error: Option<String>,
    question_mismatch: bool,
    /// Bumped on every player change, reset and start; async results carrying
    /// an older token are dropped.
    token: u64,
    prefetched: Option<Prefetched>,
    timer: Option<Countdown>,
    next_timer_id: u64,
}

impl SessionState {
    fn new(registry: Arc<ActivityRegistry>) -> Self {
        Self {
            status: SessionStatus::NoPlayer,
            player: None,
            settings: SettingsStore::new(registry),
            question: None,
            feedback: None,
            counters: SessionCounters::default(),
            is_fetching_question: false,
            is_evaluating_answer: false,
            is_advancing: false,
            countdown: None,
            error: None,
            question_mismatch: false,
            token: 0,
            prefetched: None,
            timer: None,
            next_timer_id: 0,
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            debug!(timer_id = timer.id(), "auto-advance cancelled");
            timer.cancel();
        }
        self.countdown = None;
    }

    /// Drop everything tied to the current run of rounds.
    fn clear_rounds(&mut self) {
        self.cancel_timer();
        self.question = None;
        self.feedback = None;
        self.counters = SessionCounters::default();
        self.is_fetching_question = false;
        self.is_evaluating_answer = false;
        self.is_advancing = false;
        self.error = None;
        self.question_mismatch = false;
        self.prefetched = None;
    }

    fn install_question(&mut self, question: Question, requested: &Settings) {
        let mismatch = !question.subject().eq_ignore_ascii_case(requested.subject())
            || !question
                .sub_activity()
                .eq_ignore_ascii_case(requested.sub_activity());
        if mismatch {
            warn!(
                token = self.token,
                requested_subject = requested.subject(),
                requested_sub_activity = requested.sub_activity(),
                subject = question.subject(),
                sub_activity = question.sub_activity(),
                "question does not match the requested settings"
            );
        }
        self.question_mismatch = mismatch;
        self.question = Some(question);
        self.feedback = None;
        self.error = None;
        self.status = SessionStatus::QuestionActive;
    }

    fn player_id(&self) -> Option<PlayerId> {
        self.player.as_ref().map(Player::id)
    }

    fn snapshot(&self, target_rounds: u32) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            player: self.player.clone(),
            settings: self.settings.current().clone(),
            question: self.question.clone(),
            feedback: self.feedback.clone(),
            counters: self.counters,
            target_rounds,
            is_fetching_question: self.is_fetching_question,
            is_evaluating_answer: self.is_evaluating_answer,
            is_advancing: self.is_advancing,
            countdown: self.countdown,
            error: self.error.clone(),
            question_mismatch: self.question_mismatch,
        }
    }
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

struct Shared {
    registry: Arc<ActivityRegistry>,
    provider: Arc<dyn QuestionProvider>,
    router: EvaluatorRouter,
    options: SessionOptions,
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionSnapshot>,
}

/// Drives one play session from player selection through completion.
///
/// Cheap to clone; all clones drive the same session. The state lock is never
/// held across an `.await`.
#[derive(Clone)]
pub struct GameSession {
    shared: Arc<Shared>,
}

impl GameSession {
    #[must_use]
    pub fn new(
        registry: Arc<ActivityRegistry>,
        provider: Arc<dyn QuestionProvider>,
        router: EvaluatorRouter,
        options: SessionOptions,
    ) -> Self {
        let state = SessionState::new(Arc::clone(&registry));
        let (updates, _) = watch::channel(state.snapshot(options.target_rounds));
        Self {
            shared: Arc::new(Shared {
                registry,
                provider,
                router,
                options,
                state: Mutex::new(state),
                updates,
            }),
        }
    }

    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.shared.options
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.updates.borrow().clone()
    }

    /// Receive a new snapshot after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.updates.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &SessionState) {
        self.shared
            .updates
            .send_replace(state.snapshot(self.shared.options.target_rounds));
    }

    /// Switch to `player`, discarding all session state and seeding settings
    /// from the player's saved preferences.
    pub fn select_player(&self, player: Player) -> Outcome {
        let mut state = self.lock();
        state.clear_rounds();
        state.token += 1;
        state.settings = SettingsStore::with_preferences(
            Arc::clone(&self.shared.registry),
            player.preferred_subject(),
            player.preferred_sub_activity(),
            player.preferred_difficulty(),
        );
        info!(player_id = %player.id(), token = state.token, "player selected");
        state.player = Some(player);
        state.status = SessionStatus::Idle;
        self.publish(&state);
        Outcome::Applied
    }

    /// Change the selection used by the next question fetch.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Settings` when part of the update is rejected;
    /// earlier parts stay applied.
    pub fn update_settings(&self, update: &SettingsUpdate) -> Result<Outcome, SessionError> {
        let mut state = self.lock();
        if state.player.is_none() {
            debug!("settings update ignored without a player");
            return Ok(Outcome::Ignored);
        }
        let result = state.settings.apply(update);
        state.prefetched = None;
        self.publish(&state);
        result?;
        Ok(Outcome::Applied)
    }

    /// Begin a run of rounds from `Idle`, optionally replacing the settings
    /// first, and load the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Settings` for invalid settings (state unchanged)
    /// and `SessionError::ProviderUnavailable` when the first question cannot
    /// be loaded; the session is back in `Idle` in that case.
    pub async fn start_session(&self, settings: Option<Settings>) -> Result<Outcome, SessionError> {
        let (token, player_id, requested) = {
            let mut state = self.lock();
            let Some(player_id) = state.player_id() else {
                debug!("start ignored without a player");
                return Ok(Outcome::Ignored);
            };
            if state.status != SessionStatus::Idle {
                debug!(status = ?state.status, "start ignored");
                return Ok(Outcome::Ignored);
            }
            if let Some(settings) = settings.as_ref() {
                state.settings.replace(settings)?;
            }
            state.clear_rounds();
            state.token += 1;
            state.status = SessionStatus::AwaitingQuestion;
            state.is_fetching_question = true;
            self.publish(&state);
            info!(player_id = %player_id, token = state.token, "session started");
            (state.token, player_id, state.settings.current().clone())
        };

        let result = self
            .shared
            .provider
            .fetch_question(player_id, &requested)
            .await;

        let mut state = self.lock();
        if state.token != token {
            debug!(token, current = state.token, "stale first question dropped");
            return Ok(Outcome::Stale);
        }
        state.is_fetching_question = false;
        match result {
            Ok(question) => {
                state.install_question(question, &requested);
                self.publish(&state);
                Ok(Outcome::Applied)
            }
            Err(err) => {
                warn!(player_id = %player_id, token, error = %err, "first question failed");
                state.status = SessionStatus::Idle;
                state.error = Some(err.to_string());
                self.publish(&state);
                Err(SessionError::ProviderUnavailable(err))
            }
        }
    }

    /// Submit an answer to the active question.
    ///
    /// A second submit while one is pending, or after feedback, is ignored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SubmitFailed` when the answer could not be
    /// judged; the question stays active and counters are unchanged.
    pub async fn submit_answer(&self, raw_answer: &str) -> Result<Outcome, SessionError> {
        let (token, player_id, question) = {
            let mut state = self.lock();
            if state.status != SessionStatus::QuestionActive {
                debug!(status = ?state.status, "submit ignored");
                return Ok(Outcome::Ignored);
            }
            let (Some(player_id), Some(question)) = (state.player_id(), state.question.clone())
            else {
                return Ok(Outcome::Ignored);
            };
            state.status = SessionStatus::AnswerPending;
            state.is_evaluating_answer = true;
            state.error = None;
            self.publish(&state);
            (state.token, player_id, question)
        };

        let result = self
            .shared
            .router
            .evaluate(player_id, &question, raw_answer)
            .await;

        let mut state = self.lock();
        if state.token != token || state.status != SessionStatus::AnswerPending {
            debug!(token, current = state.token, "stale verdict dropped");
            return Ok(Outcome::Stale);
        }
        state.is_evaluating_answer = false;

        let feedback = match result {
            Ok(feedback) => feedback,
            Err(err) => {
                warn!(player_id = %player_id, token, error = %err, "answer submission failed");
                state.status = SessionStatus::QuestionActive;
                state.error = Some(err.to_string());
                self.publish(&state);
                return Err(SessionError::SubmitFailed(err));
            }
        };

        state.counters = self
            .shared
            .options
            .scoring
            .apply(state.counters, feedback.is_correct);
        let counters = state.counters;
        debug!(
            player_id = %player_id,
            token,
            round = counters.rounds_played,
            is_correct = feedback.is_correct,
            score = counters.score,
            streak = counters.streak,
            "answer judged"
        );
        state.feedback = Some(feedback);

        if counters.rounds_played >= self.shared.options.target_rounds {
            state.status = SessionStatus::Completed;
            info!(player_id = %player_id, score = counters.score, "session completed");
            self.publish(&state);
            return Ok(Outcome::Applied);
        }

        state.status = SessionStatus::FeedbackShown;
        if let Some(delay) = self.shared.options.auto_advance {
            self.arm_timer(&mut state, delay);
        }
        if self.shared.options.prefetch {
            self.spawn_prefetch(token, counters.rounds_played, player_id, &state);
        }
        self.publish(&state);
        Ok(Outcome::Applied)
    }

    /// Move to the next question, from feedback or to retry a failed fetch.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ProviderUnavailable` when the next question
    /// cannot be loaded; calling `advance` again retries.
    pub async fn advance(&self) -> Result<Outcome, SessionError> {
        self.advance_with("manual").await
    }

    async fn advance_with(&self, trigger: &'static str) -> Result<Outcome, SessionError> {
        let (token, player_id, requested) = {
            let mut state = self.lock();
            let retry =
                state.status == SessionStatus::AwaitingNextQuestion && !state.is_fetching_question;
            if state.status != SessionStatus::FeedbackShown && !retry {
                debug!(status = ?state.status, trigger, "advance ignored");
                return Ok(Outcome::Ignored);
            }
            let Some(player_id) = state.player_id() else {
                return Ok(Outcome::Ignored);
            };
            state.cancel_timer();
            state.feedback = None;
            state.question = None;
            state.error = None;
            let requested = state.settings.current().clone();

            let (current, round) = (state.token, state.counters.rounds_played);
            let ready = state
                .prefetched
                .take()
                .filter(|p| p.token == current && p.round == round);
            if let Some(prefetched) = ready {
                debug!(token = state.token, round, trigger, "using prefetched question");
                state.install_question(prefetched.question, &requested);
                self.publish(&state);
                return Ok(Outcome::Applied);
            }

            state.status = SessionStatus::AwaitingNextQuestion;
            state.is_fetching_question = true;
            state.is_advancing = true;
            self.publish(&state);
            debug!(token = state.token, round, trigger, "fetching next question");
            (state.token, player_id, requested)
        };

        let result = self
            .shared
            .provider
            .fetch_question(player_id, &requested)
            .await;

        let mut state = self.lock();
        if state.token != token {
            debug!(token, current = state.token, "stale next question dropped");
            return Ok(Outcome::Stale);
        }
        state.is_fetching_question = false;
        state.is_advancing = false;
        match result {
            Ok(question) => {
                state.install_question(question, &requested);
                self.publish(&state);
                Ok(Outcome::Applied)
            }
            Err(err) => {
                warn!(player_id = %player_id, token, error = %err, "next question failed");
                state.error = Some(err.to_string());
                self.publish(&state);
                Err(SessionError::ProviderUnavailable(err))
            }
        }
    }

    /// Return to `Idle` (keeping the player) or `NoPlayer`, discarding all
    /// session state. In-flight results are dropped when they arrive.
    pub fn reset_session(&self, keep_player: bool) -> Outcome {
        let mut state = self.lock();
        state.clear_rounds();
        state.token += 1;
        if keep_player && state.player.is_some() {
            state.status = SessionStatus::Idle;
        } else {
            state.player = None;
            state.settings = SettingsStore::new(Arc::clone(&self.shared.registry));
            state.status = SessionStatus::NoPlayer;
        }
        info!(token = state.token, keep_player, "session reset");
        self.publish(&state);
        Outcome::Applied
    }

    /// React to a player being deleted elsewhere.
    pub fn forget_player(&self, id: PlayerId) -> Outcome {
        if self.lock().player_id() == Some(id) {
            self.reset_session(false)
        } else {
            Outcome::Ignored
        }
    }

    //
    // ─── BACKGROUND WORK ───────────────────────────────────────────────────────
    //

    fn arm_timer(&self, state: &mut SessionState, delay: Duration) {
        state.cancel_timer();
        state.next_timer_id += 1;
        let id = state.next_timer_id;
        let ticker = self.clone();
        let expirer = self.clone();
        state.timer = Some(Countdown::spawn(
            id,
            delay,
            move |secs| ticker.on_timer_tick(id, secs),
            move || async move {
                expirer.on_timer_expired(id).await;
            },
        ));
        debug!(timer_id = id, token = state.token, "auto-advance armed");
    }

    fn on_timer_tick(&self, id: u64, secs: u32) -> bool {
        let mut state = self.lock();
        let current = state.timer.as_ref().map(Countdown::id) == Some(id)
            && state.status == SessionStatus::FeedbackShown;
        if current {
            state.countdown = Some(secs);
            self.publish(&state);
        }
        current
    }

    async fn on_timer_expired(&self, id: u64) {
        {
            let mut state = self.lock();
            match state.timer.take() {
                Some(timer) if timer.id() == id => timer.detach(),
                other => {
                    state.timer = other;
                    debug!(timer_id = id, "expired timer ignored");
                    return;
                }
            }
        }
        if let Err(err) = self.advance_with("timer").await {
            debug!(error = %err, "auto-advance failed; waiting for retry");
        }
    }

    fn spawn_prefetch(&self, token: u64, round: u32, player_id: PlayerId, state: &SessionState) {
        let session = self.clone();
        let requested = state.settings.current().clone();
        tokio::spawn(async move {
            let result = session
                .shared
                .provider
                .fetch_question(player_id, &requested)
                .await;
            let mut state = session.lock();
            match result {
                Ok(question) => {
                    let still_waiting = state.token == token
                        && state.status == SessionStatus::FeedbackShown
                        && state.counters.rounds_played == round
                        && state.settings.current() == &requested;
                    if still_waiting {
                        debug!(token, round, "prefetched question stored");
                        state.prefetched = Some(Prefetched {
                            token,
                            round,
                            question,
                        });
                    } else {
                        debug!(token, round, "prefetched question discarded");
                    }
                }
                Err(err) => warn!(token, round, error = %err, "prefetch failed"),
            }
        });
    }
}
