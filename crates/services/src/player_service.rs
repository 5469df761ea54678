use std::sync::Arc;

use tracing::info;

use quiz_core::model::{NewPlayer, Player, PlayerId};
use storage::repository::{NewPlayerRecord, PlayerRepository, StorageError};

use crate::Clock;
use crate::error::PlayerServiceError;

/// Player roster operations over a `PlayerRepository`.
#[derive(Clone)]
pub struct PlayerService {
    clock: Clock,
    players: Arc<dyn PlayerRepository>,
}

impl PlayerService {
    #[must_use]
    pub fn new(clock: Clock, players: Arc<dyn PlayerRepository>) -> Self {
        Self { clock, players }
    }

    /// List players ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `PlayerServiceError::Storage` if repository access fails.
    pub async fn list_players(&self) -> Result<Vec<Player>, PlayerServiceError> {
        Ok(self.players.list_players().await?)
    }

    /// Fetch a player by id.
    ///
    /// # Errors
    ///
    /// Returns `PlayerServiceError::NotFound` for unknown ids.
    pub async fn get_player(&self, id: PlayerId) -> Result<Player, PlayerServiceError> {
        self.players
            .get_player(id)
            .await?
            .ok_or(PlayerServiceError::NotFound(id))
    }

    /// Validate and persist a new player.
    ///
    /// # Errors
    ///
    /// Returns `PlayerServiceError::Player` for validation failures and
    /// `PlayerServiceError::DuplicateName` when the name is taken.
    pub async fn create_player(&self, draft: NewPlayer) -> Result<Player, PlayerServiceError> {
        let now = self.clock.now();
        let player = draft.validate(PlayerId::new(1), now)?;
        let id = self
            .players
            .insert_player(NewPlayerRecord::from_player(&player))
            .await
            .map_err(|err| match err {
                StorageError::Conflict => PlayerServiceError::DuplicateName,
                other => PlayerServiceError::Storage(other),
            })?;
        info!(player_id = %id, name = player.name(), "player created");
        self.get_player(id).await
    }

    /// Remember the player's last selection.
    ///
    /// # Errors
    ///
    /// Returns `PlayerServiceError::Storage` if persistence fails.
    pub async fn save_preferences(&self, player: &Player) -> Result<(), PlayerServiceError> {
        self.players.upsert_player(player).await?;
        Ok(())
    }

    /// Remove a player.
    ///
    /// # Errors
    ///
    /// Returns `PlayerServiceError::NotFound` for unknown ids.
    pub async fn delete_player(&self, id: PlayerId) -> Result<(), PlayerServiceError> {
        self.players.delete_player(id).await.map_err(|err| match err {
            StorageError::NotFound => PlayerServiceError::NotFound(id),
            other => PlayerServiceError::Storage(other),
        })?;
        info!(player_id = %id, "player deleted");
        Ok(())
    }
}
