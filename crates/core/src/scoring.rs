use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringPolicyError {
    #[error("bonus tier thresholds must strictly increase (got {previous} then {next})")]
    UnorderedThresholds { previous: u32, next: u32 },

    #[error("bonus tiers must not decrease (got {previous} then {next})")]
    DecreasingBonus { previous: u32, next: u32 },

    #[error("bonus tier threshold must be at least 1")]
    ZeroThreshold,
}

//
// ─── COUNTERS ──────────────────────────────────────────────────────────────────
//

/// Running totals for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    pub score: u32,
    pub streak: u32,
    pub rounds_played: u32,
}

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// A flat bonus granted once the resulting streak reaches `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusTier {
    pub threshold: u32,
    pub bonus: u32,
}

/// Base award plus a monotonic step bonus keyed on the resulting streak.
///
/// ```
/// # use quiz_core::scoring::{ScoringPolicy, SessionCounters};
/// let policy = ScoringPolicy::default();
/// let after = policy.apply(SessionCounters::default(), true);
/// assert_eq!((after.score, after.streak, after.rounds_played), (10, 1, 1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    base_award: u32,
    tiers: Vec<BonusTier>,
}

impl ScoringPolicy {
    /// Build a policy from tiers sorted by threshold.
    ///
    /// # Errors
    ///
    /// Returns `ScoringPolicyError` if thresholds are not strictly increasing,
    /// start at zero, or bonuses decrease, since any of these would make the
    /// bonus non-monotonic in the streak.
    pub fn new(base_award: u32, tiers: Vec<BonusTier>) -> Result<Self, ScoringPolicyError> {
        if tiers.first().is_some_and(|tier| tier.threshold == 0) {
            return Err(ScoringPolicyError::ZeroThreshold);
        }
        for pair in tiers.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if next.threshold <= prev.threshold {
                return Err(ScoringPolicyError::UnorderedThresholds {
                    previous: prev.threshold,
                    next: next.threshold,
                });
            }
            if next.bonus < prev.bonus {
                return Err(ScoringPolicyError::DecreasingBonus {
                    previous: prev.bonus,
                    next: next.bonus,
                });
            }
        }
        Ok(Self { base_award, tiers })
    }

    #[must_use]
    pub fn base_award(&self) -> u32 {
        self.base_award
    }

    #[must_use]
    pub fn tiers(&self) -> &[BonusTier] {
        &self.tiers
    }

    /// Bonus for having reached `streak` correct answers in a row.
    #[must_use]
    pub fn streak_bonus(&self, streak: u32) -> u32 {
        self.tiers
            .iter()
            .take_while(|tier| tier.threshold <= streak)
            .last()
            .map_or(0, |tier| tier.bonus)
    }

    /// Fold one answer into the counters.
    #[must_use]
    pub fn apply(&self, counters: SessionCounters, is_correct: bool) -> SessionCounters {
        let rounds_played = counters.rounds_played.saturating_add(1);
        if is_correct {
            let streak = counters.streak.saturating_add(1);
            let award = self.base_award.saturating_add(self.streak_bonus(streak));
            SessionCounters {
                score: counters.score.saturating_add(award),
                streak,
                rounds_played,
            }
        } else {
            SessionCounters {
                score: counters.score,
                streak: 0,
                rounds_played,
            }
        }
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base_award: 10,
            tiers: vec![
                BonusTier {
                    threshold: 3,
                    bonus: 5,
                },
                BonusTier {
                    threshold: 5,
                    bonus: 10,
                },
                BonusTier {
                    threshold: 10,
                    bonus: 20,
                },
            ],
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
