use quiz_core::model::{Difficulty, NewPlayer, Player, PlayerId};
use quiz_core::time::fixed_now;
use storage::repository::{NewPlayerRecord, PlayerRepository, Storage, StorageError};
use storage::sqlite::SqliteRepository;

fn build_player(name: &str) -> Player {
    NewPlayer {
        name: name.into(),
        age: 8,
        grade: 3,
        avatar: None,
    }
    .validate(PlayerId::new(1), fixed_now())
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_persists_preferences() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_players_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let id = repo
        .insert_player(NewPlayerRecord::from_player(&build_player("Ava")))
        .await
        .unwrap();

    let updated = repo
        .get_player(id)
        .await
        .unwrap()
        .expect("player exists")
        .with_preferences("Science", "Weather", Difficulty::Hard);
    repo.upsert_player(&updated).await.unwrap();

    let fetched = repo.get_player(id).await.unwrap().unwrap();
    assert_eq!(fetched.name(), "Ava");
    assert_eq!(fetched.preferred_subject(), "Science");
    assert_eq!(fetched.preferred_sub_activity(), "Weather");
    assert_eq!(fetched.preferred_difficulty(), Difficulty::Hard);
    assert_eq!(fetched.created_at(), fixed_now());
}

#[tokio::test]
async fn sqlite_rejects_duplicate_names_case_insensitively() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_players_dupes?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.insert_player(NewPlayerRecord::from_player(&build_player("Noah")))
        .await
        .unwrap();
    let err = repo
        .insert_player(NewPlayerRecord::from_player(&build_player("NOAH")))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_lists_and_deletes() {
    let storage = Storage::sqlite("sqlite:file:memdb_players_delete?mode=memory&cache=shared")
        .await
        .expect("storage");

    let first = storage
        .players
        .insert_player(NewPlayerRecord::from_player(&build_player("Mia")))
        .await
        .unwrap();
    let second = storage
        .players
        .insert_player(NewPlayerRecord::from_player(&build_player("Leo")))
        .await
        .unwrap();

    let names: Vec<String> = storage
        .players
        .list_players()
        .await
        .unwrap()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(names, vec!["Mia".to_string(), "Leo".to_string()]);

    storage.players.delete_player(first).await.unwrap();
    assert!(storage.players.get_player(first).await.unwrap().is_none());
    assert!(storage.players.get_player(second).await.unwrap().is_some());

    let err = storage.players.delete_player(first).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_players_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}
