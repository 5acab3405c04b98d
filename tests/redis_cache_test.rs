#![cfg(feature = "redis-tests")]

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use env_store_server::domain::entity::env_variable::EnvVariable;
use env_store_server::infrastructure::cache::{EnvVariableCache, RedisEnvVariableCache};

// 世代カウンタはキャッシュ全体で 1 つなので、テストを直列に実行する
static REDIS_LOCK: Mutex<()> = Mutex::const_new(());

async fn setup() -> (MutexGuard<'static, ()>, RedisEnvVariableCache) {
    let guard = REDIS_LOCK.lock().await;
    let url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string());
    let cache = RedisEnvVariableCache::connect(&url, Duration::from_secs(60))
        .await
        .unwrap();
    cache.clear().await.unwrap();
    (guard, cache)
}

fn entry(key: &str, value: &str) -> EnvVariable {
    EnvVariable::new(key, value, None)
}

// --- 世代による条件付き書き込み ---

#[tokio::test]
async fn test_put_with_stale_generation_is_rejected() {
    let (_guard, cache) = setup().await;

    let observed = cache.generation().await.unwrap();
    cache.invalidate("FEATURE_X").await.unwrap();

    assert!(!cache.put(&entry("FEATURE_X", "stale"), observed).await.unwrap());
    assert!(cache.get("FEATURE_X").await.unwrap().is_none());

    let current = cache.generation().await.unwrap();
    assert!(cache.put(&entry("FEATURE_X", "on"), current).await.unwrap());
    assert_eq!(cache.get("FEATURE_X").await.unwrap().unwrap().value, "on");
}

#[tokio::test]
async fn test_put_all_with_stale_generation_is_rejected() {
    let (_guard, cache) = setup().await;

    let observed = cache.generation().await.unwrap();
    cache.invalidate("OTHER").await.unwrap();

    let entries = vec![entry("A", "1"), entry("B", "2")];
    assert!(!cache.put_all(&entries, observed).await.unwrap());
    assert!(cache.list_all().await.unwrap().is_none());
    assert!(cache.get("A").await.unwrap().is_none());
}

// --- invalidate / clear ---

#[tokio::test]
async fn test_invalidate_drops_entry_and_snapshot_and_bumps_generation() {
    let (_guard, cache) = setup().await;

    let generation = cache.generation().await.unwrap();
    let entries = vec![entry("A", "1"), entry("B", "2")];
    assert!(cache.put_all(&entries, generation).await.unwrap());
    assert_eq!(cache.list_all().await.unwrap().unwrap(), entries);

    cache.invalidate("A").await.unwrap();

    assert_eq!(cache.generation().await.unwrap(), generation + 1);
    assert!(cache.get("A").await.unwrap().is_none());
    assert!(cache.list_all().await.unwrap().is_none());
    assert_eq!(cache.get("B").await.unwrap().unwrap().value, "2");
}

#[tokio::test]
async fn test_clear_removes_everything_and_bumps_generation() {
    let (_guard, cache) = setup().await;

    let generation = cache.generation().await.unwrap();
    let entries: Vec<EnvVariable> = (0..20).map(|i| entry(&format!("KEY_{i}"), "v")).collect();
    assert!(cache.put_all(&entries, generation).await.unwrap());

    cache.clear().await.unwrap();

    assert_eq!(cache.generation().await.unwrap(), generation + 1);
    assert!(cache.list_all().await.unwrap().is_none());
    for e in &entries {
        assert!(cache.get(&e.key).await.unwrap().is_none());
    }
    // 古い世代での再投入は拒否される
    assert!(!cache.put_all(&entries, generation).await.unwrap());
}

#[tokio::test]
async fn test_ping() {
    let (_guard, cache) = setup().await;
    cache.ping().await.unwrap();
}
