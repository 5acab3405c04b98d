#![cfg(feature = "db-tests")]

use sqlx::PgPool;

use env_store_server::adapter::repository::EnvVariablePostgresRepository;
use env_store_server::domain::entity::env_variable::{EnvVariable, EnvVariablePatch};
use env_store_server::domain::repository::EnvVariableRepository;

fn make_entry(key: &str, value: &str) -> EnvVariable {
    EnvVariable::new(key, value, Some(format!("{} description", key)))
}

fn value_patch(value: &str) -> EnvVariablePatch {
    EnvVariablePatch {
        value: Some(value.to_string()),
        description: None,
    }
}

// --- 作成・取得 ---

#[sqlx::test(migrations = "./migrations")]
async fn test_create_and_find(pool: PgPool) {
    let repo = EnvVariablePostgresRepository::new(pool);

    assert!(repo.create_if_absent(&make_entry("FEATURE_X", "off")).await.unwrap());

    let found = repo.find_by_key("FEATURE_X").await.unwrap().unwrap();
    assert_eq!(found.value, "off");
    assert_eq!(found.description.as_deref(), Some("FEATURE_X description"));
    assert!(found.updated_at >= found.created_at);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_if_absent_keeps_existing(pool: PgPool) {
    let repo = EnvVariablePostgresRepository::new(pool);

    assert!(repo.create_if_absent(&make_entry("FEATURE_X", "off")).await.unwrap());
    assert!(!repo.create_if_absent(&make_entry("FEATURE_X", "on")).await.unwrap());

    let found = repo.find_by_key("FEATURE_X").await.unwrap().unwrap();
    assert_eq!(found.value, "off");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_find_missing_key(pool: PgPool) {
    let repo = EnvVariablePostgresRepository::new(pool);
    assert!(repo.find_by_key("missing-key").await.unwrap().is_none());
}

// --- 一覧 ---

#[sqlx::test(migrations = "./migrations")]
async fn test_list_all_in_insertion_order(pool: PgPool) {
    let repo = EnvVariablePostgresRepository::new(pool);
    for key in ["ZETA", "ALPHA", "MID"] {
        repo.create_if_absent(&make_entry(key, "v")).await.unwrap();
    }

    let keys: Vec<String> = repo
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.key)
        .collect();
    assert_eq!(keys, vec!["ZETA", "ALPHA", "MID"]);
}

// --- 更新 ---

#[sqlx::test(migrations = "./migrations")]
async fn test_partial_update_keeps_description(pool: PgPool) {
    let repo = EnvVariablePostgresRepository::new(pool);
    repo.create_if_absent(&make_entry("FEATURE_X", "off")).await.unwrap();

    let updated = repo
        .update("FEATURE_X", &value_patch("on"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.value, "on");
    assert_eq!(updated.description.as_deref(), Some("FEATURE_X description"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_updated_at_strictly_increases(pool: PgPool) {
    let repo = EnvVariablePostgresRepository::new(pool);
    repo.create_if_absent(&make_entry("FEATURE_X", "off")).await.unwrap();

    let mut previous = repo.find_by_key("FEATURE_X").await.unwrap().unwrap();
    for value in ["a", "b", "c"] {
        let updated = repo
            .update("FEATURE_X", &value_patch(value))
            .await
            .unwrap()
            .unwrap();
        assert!(updated.updated_at > previous.updated_at);
        assert_eq!(updated.created_at, previous.created_at);
        previous = updated;
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_missing_key_returns_none(pool: PgPool) {
    let repo = EnvVariablePostgresRepository::new(pool);
    let result = repo.update("missing-key", &value_patch("on")).await.unwrap();
    assert!(result.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_updates_serialize(pool: PgPool) {
    let repo = EnvVariablePostgresRepository::new(pool);
    repo.create_if_absent(&make_entry("FEATURE_X", "off")).await.unwrap();

    let (a, b) = tokio::join!(
        repo.update("FEATURE_X", &value_patch("a")),
        repo.update("FEATURE_X", &value_patch("b")),
    );
    let (a, b) = (a.unwrap().unwrap(), b.unwrap().unwrap());
    assert_ne!(a.updated_at, b.updated_at);

    let last = if a.updated_at > b.updated_at { a } else { b };
    let stored = repo.find_by_key("FEATURE_X").await.unwrap().unwrap();
    assert_eq!(stored.value, last.value);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_ping(pool: PgPool) {
    let repo = EnvVariablePostgresRepository::new(pool);
    repo.ping().await.unwrap();
}
