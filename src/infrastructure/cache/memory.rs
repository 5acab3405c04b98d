/// InMemoryEnvVariableCache はプロセス内の環境変数キャッシュ。
/// moka::future::Cache を使用し、TTL 付きでエントリをキャッシュする。
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tokio::sync::RwLock;

use super::{CacheError, EnvVariableCache};
use crate::domain::entity::env_variable::EnvVariable;

pub struct InMemoryEnvVariableCache {
    entries: Cache<String, Arc<EnvVariable>>,
    // 全件ミラーは単一スロットとして保持する
    snapshot: Cache<(), Arc<Vec<EnvVariable>>>,
    // 世代の読み取りと put は read ロック、invalidate は write ロックで直列化する
    generation: RwLock<u64>,
}

impl InMemoryEnvVariableCache {
    /// 新しい InMemoryEnvVariableCache を作成する。
    ///
    /// # Arguments
    /// * `max_capacity` - キャッシュに保持する最大エントリ数
    /// * `ttl_secs` - エントリの有効期間（秒）
    pub fn new(max_capacity: u64, ttl_secs: u64) -> Self {
        let ttl = Duration::from_secs(ttl_secs);
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        let snapshot = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self {
            entries,
            snapshot,
            generation: RwLock::new(0),
        }
    }
}

#[async_trait]
impl EnvVariableCache for InMemoryEnvVariableCache {
    async fn generation(&self) -> Result<u64, CacheError> {
        Ok(*self.generation.read().await)
    }

    async fn get(&self, key: &str) -> Result<Option<EnvVariable>, CacheError> {
        Ok(self
            .entries
            .get(key)
            .await
            .map(|entry| (*entry).clone()))
    }

    async fn list_all(&self) -> Result<Option<Vec<EnvVariable>>, CacheError> {
        Ok(self.snapshot.get(&()).await.map(|all| (*all).clone()))
    }

    async fn put(&self, entry: &EnvVariable, generation: u64) -> Result<bool, CacheError> {
        let current = self.generation.read().await;
        if *current != generation {
            return Ok(false);
        }
        self.entries
            .insert(entry.key.clone(), Arc::new(entry.clone()))
            .await;
        Ok(true)
    }

    async fn put_all(&self, entries: &[EnvVariable], generation: u64) -> Result<bool, CacheError> {
        let current = self.generation.read().await;
        if *current != generation {
            return Ok(false);
        }
        for entry in entries {
            self.entries
                .insert(entry.key.clone(), Arc::new(entry.clone()))
                .await;
        }
        self.snapshot.insert((), Arc::new(entries.to_vec())).await;
        Ok(true)
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut current = self.generation.write().await;
        *current += 1;
        self.entries.invalidate(key).await;
        self.snapshot.invalidate(&()).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut current = self.generation.write().await;
        *current += 1;
        self.entries.invalidate_all();
        self.snapshot.invalidate_all();
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
