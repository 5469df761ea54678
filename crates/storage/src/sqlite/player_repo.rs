use async_trait::async_trait;
use quiz_core::model::{Player, PlayerId};

use super::SqliteRepository;
use super::mapping::{map_player_row, player_id_from_i64, player_id_to_i64, write_error};
use crate::repository::{NewPlayerRecord, PlayerRepository, StorageError};

const PLAYER_COLUMNS: &str = "id, name, age, grade, avatar, preferred_subject, \
     preferred_sub_activity, preferred_difficulty, created_at";

#[async_trait]
impl PlayerRepository for SqliteRepository {
    async fn insert_player(&self, player: NewPlayerRecord) -> Result<PlayerId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO players (name, age, grade, avatar, preferred_subject, preferred_sub_activity, preferred_difficulty, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(player.name)
        .bind(i64::from(player.age))
        .bind(i64::from(player.grade))
        .bind(player.avatar)
        .bind(player.preferred_subject)
        .bind(player.preferred_sub_activity)
        .bind(player.preferred_difficulty.as_str())
        .bind(player.created_at)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        player_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_player(&self, player: &Player) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO players (id, name, age, grade, avatar, preferred_subject, preferred_sub_activity, preferred_difficulty, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                age = excluded.age,
                grade = excluded.grade,
                avatar = excluded.avatar,
                preferred_subject = excluded.preferred_subject,
                preferred_sub_activity = excluded.preferred_sub_activity,
                preferred_difficulty = excluded.preferred_difficulty
            ",
        )
        .bind(player_id_to_i64(player.id())?)
        .bind(player.name())
        .bind(i64::from(player.age()))
        .bind(i64::from(player.grade()))
        .bind(player.avatar())
        .bind(player.preferred_subject())
        .bind(player.preferred_sub_activity())
        .bind(player.preferred_difficulty().as_str())
        .bind(player.created_at())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    async fn get_player(&self, id: PlayerId) -> Result<Option<Player>, StorageError> {
        let row = sqlx::query(&format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1"))
            .bind(player_id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_player_row).transpose()
    }

    async fn list_players(&self) -> Result<Vec<Player>, StorageError> {
        let rows = sqlx::query(&format!("SELECT {PLAYER_COLUMNS} FROM players ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_player_row).collect()
    }

    async fn delete_player(&self, id: PlayerId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM players WHERE id = ?1")
            .bind(player_id_to_i64(id)?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
