use quiz_core::model::{Feedback, Player, Question, Settings};
use quiz_core::scoring::SessionCounters;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    #[default]
    NoPlayer,
    Idle,
    AwaitingQuestion,
    QuestionActive,
    AnswerPending,
    FeedbackShown,
    AwaitingNextQuestion,
    Completed,
}

impl SessionStatus {
    /// A round is underway or between rounds.
    #[must_use]
    pub fn is_playing(self) -> bool {
        matches!(
            self,
            SessionStatus::AwaitingQuestion
                | SessionStatus::QuestionActive
                | SessionStatus::AnswerPending
                | SessionStatus::FeedbackShown
                | SessionStatus::AwaitingNextQuestion
        )
    }
}

/// What an action did to the session.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Not valid in the current state; nothing changed.
    Ignored,
    /// The session moved on while the request was in flight; its result was dropped.
    Stale,
}

/// Read-only view of a session, published after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub player: Option<Player>,
    pub settings: Settings,
    pub question: Option<Question>,
    pub feedback: Option<Feedback>,
    pub counters: SessionCounters,
    pub target_rounds: u32,
    pub is_fetching_question: bool,
    pub is_evaluating_answer: bool,
    pub is_advancing: bool,
    /// Whole seconds left before auto-advance.
    pub countdown: Option<u32>,
    pub error: Option<String>,
    /// The last question was filed under a different subject or activity
    /// than requested.
    pub question_mismatch: bool,
}

impl SessionSnapshot {
    /// One-based number of the round on screen.
    #[must_use]
    pub fn round(&self) -> u32 {
        match self.status {
            SessionStatus::FeedbackShown | SessionStatus::Completed => self.counters.rounds_played,
            _ => self.counters.rounds_played.saturating_add(1),
        }
    }
}
