use quiz_core::model::{Difficulty, Player, PlayerId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn player_id_to_i64(id: PlayerId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("player_id overflow".into()))
}

pub(crate) fn player_id_from_i64(v: i64) -> Result<PlayerId, StorageError> {
    u64::try_from(v)
        .map(PlayerId::new)
        .map_err(|_| StorageError::Serialization("player_id sign overflow".into()))
}

fn small_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

/// Maps a unique-constraint violation to `Conflict`, anything else to `Connection`.
pub(crate) fn write_error(err: sqlx::Error) -> StorageError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(err.to_string()),
    }
}

pub(crate) fn map_player_row(row: &SqliteRow) -> Result<Player, StorageError> {
    let difficulty: String = row.try_get("preferred_difficulty").map_err(ser)?;
    let difficulty = difficulty.parse::<Difficulty>().map_err(ser)?;

    Player::from_persisted(
        player_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get("name").map_err(ser)?,
        small_from_i64("age", row.try_get("age").map_err(ser)?)?,
        small_from_i64("grade", row.try_get("grade").map_err(ser)?)?,
        row.try_get("avatar").map_err(ser)?,
        row.try_get("preferred_subject").map_err(ser)?,
        row.try_get("preferred_sub_activity").map_err(ser)?,
        difficulty,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}
