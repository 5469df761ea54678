use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::PlayerId;
use crate::model::settings::Difficulty;

const DEFAULT_AVATAR: &str = "default.png";
const DEFAULT_SUBJECT: &str = "Math";
const DEFAULT_SUB_ACTIVITY: &str = "Addition/Subtraction";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlayerError {
    #[error("player name cannot be empty")]
    EmptyName,

    #[error("grade must be between 1 and 12, got {0}")]
    InvalidGrade(u8),

    #[error("age must be between 3 and 18, got {0}")]
    InvalidAge(u8),
}

//
// ─── PLAYER ────────────────────────────────────────────────────────────────────
//

/// Fields a caller supplies when creating a player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPlayer {
    pub name: String,
    pub age: u8,
    pub grade: u8,
    pub avatar: Option<String>,
}

impl NewPlayer {
    /// Validate and normalize into a player with default preferences.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` for a blank name or out-of-range age/grade.
    pub fn validate(self, id: PlayerId, created_at: DateTime<Utc>) -> Result<Player, PlayerError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(PlayerError::EmptyName);
        }
        if !(1..=12).contains(&self.grade) {
            return Err(PlayerError::InvalidGrade(self.grade));
        }
        if !(3..=18).contains(&self.age) {
            return Err(PlayerError::InvalidAge(self.age));
        }
        let avatar = self
            .avatar
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_AVATAR.to_string());

        Ok(Player {
            id,
            name,
            age: self.age,
            grade: self.grade,
            avatar,
            preferred_subject: DEFAULT_SUBJECT.to_string(),
            preferred_sub_activity: DEFAULT_SUB_ACTIVITY.to_string(),
            preferred_difficulty: Difficulty::Easy,
            created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    name: String,
    age: u8,
    grade: u8,
    avatar: String,
    preferred_subject: String,
    preferred_sub_activity: String,
    preferred_difficulty: Difficulty,
    created_at: DateTime<Utc>,
}

impl Player {
    /// Rehydrate a player from storage.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` if the persisted name/age/grade are invalid.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: PlayerId,
        name: String,
        age: u8,
        grade: u8,
        avatar: String,
        preferred_subject: String,
        preferred_sub_activity: String,
        preferred_difficulty: Difficulty,
        created_at: DateTime<Utc>,
    ) -> Result<Self, PlayerError> {
        let mut player = NewPlayer {
            name,
            age,
            grade,
            avatar: Some(avatar),
        }
        .validate(id, created_at)?;
        player.preferred_subject = preferred_subject;
        player.preferred_sub_activity = preferred_sub_activity;
        player.preferred_difficulty = preferred_difficulty;
        Ok(player)
    }

    #[must_use]
    pub fn with_preferences(
        mut self,
        subject: impl Into<String>,
        sub_activity: impl Into<String>,
        difficulty: Difficulty,
    ) -> Self {
        self.preferred_subject = subject.into();
        self.preferred_sub_activity = sub_activity.into();
        self.preferred_difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn id(&self) -> PlayerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn age(&self) -> u8 {
        self.age
    }

    #[must_use]
    pub fn grade(&self) -> u8 {
        self.grade
    }

    #[must_use]
    pub fn avatar(&self) -> &str {
        &self.avatar
    }

    #[must_use]
    pub fn preferred_subject(&self) -> &str {
        &self.preferred_subject
    }

    #[must_use]
    pub fn preferred_sub_activity(&self) -> &str {
        &self.preferred_sub_activity
    }

    #[must_use]
    pub fn preferred_difficulty(&self) -> Difficulty {
        self.preferred_difficulty
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
