use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{Difficulty, Player, PlayerId};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Insert shape for a player whose id is assigned by the repository.
#[derive(Debug, Clone)]
pub struct NewPlayerRecord {
    pub name: String,
    pub age: u8,
    pub grade: u8,
    pub avatar: String,
    pub preferred_subject: String,
    pub preferred_sub_activity: String,
    pub preferred_difficulty: Difficulty,
    pub created_at: DateTime<Utc>,
}

impl NewPlayerRecord {
    /// Copy everything except the id from a validated player.
    #[must_use]
    pub fn from_player(player: &Player) -> Self {
        Self {
            name: player.name().to_string(),
            age: player.age(),
            grade: player.grade(),
            avatar: player.avatar().to_string(),
            preferred_subject: player.preferred_subject().to_string(),
            preferred_sub_activity: player.preferred_sub_activity().to_string(),
            preferred_difficulty: player.preferred_difficulty(),
            created_at: player.created_at(),
        }
    }

    fn into_player(self, id: PlayerId) -> Result<Player, StorageError> {
        Player::from_persisted(
            id,
            self.name,
            self.age,
            self.grade,
            self.avatar,
            self.preferred_subject,
            self.preferred_sub_activity,
            self.preferred_difficulty,
            self.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Repository contract for players.
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Insert a new player and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the name is already taken
    /// (case-insensitive), or other storage errors.
    async fn insert_player(&self, player: NewPlayerRecord) -> Result<PlayerId, StorageError>;

    /// Persist or update a player, keeping its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if another player holds the name.
    async fn upsert_player(&self, player: &Player) -> Result<(), StorageError>;

    /// Fetch a player by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn get_player(&self, id: PlayerId) -> Result<Option<Player>, StorageError>;

    /// List all players ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn list_players(&self) -> Result<Vec<Player>, StorageError>;

    /// Remove a player.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such player exists.
    async fn delete_player(&self, id: PlayerId) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    players: Arc<Mutex<BTreeMap<PlayerId, Player>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn name_taken(players: &BTreeMap<PlayerId, Player>, name: &str, except: Option<PlayerId>) -> bool {
    players
        .values()
        .any(|p| Some(p.id()) != except && p.name().eq_ignore_ascii_case(name))
}

#[async_trait]
impl PlayerRepository for InMemoryRepository {
    async fn insert_player(&self, player: NewPlayerRecord) -> Result<PlayerId, StorageError> {
        let mut guard = self
            .players
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if name_taken(&guard, &player.name, None) {
            return Err(StorageError::Conflict);
        }
        let next = guard.keys().next_back().map_or(1, |id| id.value() + 1);
        let id = PlayerId::new(next);
        guard.insert(id, player.into_player(id)?);
        Ok(id)
    }

    async fn upsert_player(&self, player: &Player) -> Result<(), StorageError> {
        let mut guard = self
            .players
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if name_taken(&guard, player.name(), Some(player.id())) {
            return Err(StorageError::Conflict);
        }
        guard.insert(player.id(), player.clone());
        Ok(())
    }

    async fn get_player(&self, id: PlayerId) -> Result<Option<Player>, StorageError> {
        let guard = self
            .players
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_players(&self) -> Result<Vec<Player>, StorageError> {
        let guard = self
            .players
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().cloned().collect())
    }

    async fn delete_player(&self, id: PlayerId) -> Result<(), StorageError> {
        let mut guard = self
            .players
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub players: Arc<dyn PlayerRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let players: Arc<dyn PlayerRepository> = Arc::new(InMemoryRepository::new());
        Self { players }
    }
}
