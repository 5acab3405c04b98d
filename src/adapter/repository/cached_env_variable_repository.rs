use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::entity::env_variable::{EnvVariable, EnvVariablePatch};
use crate::domain::repository::{is_store_timeout, EnvVariableRepository, StoreTimeoutError};
use crate::infrastructure::cache::{CacheError, EnvVariableCache};

/// CachePolicy はストア・キャッシュ呼び出しのタイムアウトと読み込みリトライ回数を表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub store_timeout: Duration,
    pub cache_timeout: Duration,
    /// 読み込みがタイムアウトした場合の追加試行回数。更新はリトライしない。
    pub read_retries: u32,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            cache_timeout: Duration::from_millis(500),
            read_retries: 1,
        }
    }
}

/// CachedEnvVariableRepository は EnvVariableRepository をキャッシュでラップする。
///
/// - 読み込み: キャッシュを先に参照し、ミス時はストアから取得してキャッシュに格納する。
///   格納はストアを読む前に取得した世代が変わっていない場合にだけ反映される。
/// - 書き込み: ストアへの書き込みが確定した後にキャッシュを invalidate する。
///   新しい値をキャッシュへ直接書き込むことはしない。
/// - invalidate に失敗した key は保留集合に記録し、解消されるまでキャッシュを迂回する。
pub struct CachedEnvVariableRepository {
    inner: Arc<dyn EnvVariableRepository>,
    cache: Arc<dyn EnvVariableCache>,
    policy: CachePolicy,
    pending: Mutex<HashSet<String>>,
}

impl CachedEnvVariableRepository {
    /// 新しい CachedEnvVariableRepository を作成する。
    pub fn new(inner: Arc<dyn EnvVariableRepository>, cache: Arc<dyn EnvVariableCache>) -> Self {
        Self::with_policy(inner, cache, CachePolicy::default())
    }

    pub fn with_policy(
        inner: Arc<dyn EnvVariableRepository>,
        cache: Arc<dyn EnvVariableCache>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            inner,
            cache,
            policy,
            pending: Mutex::new(HashSet::new()),
        }
    }

    /// ストアの全件でキャッシュを作り直す。同期した件数を返す。
    /// キャッシュが利用できない場合はエラーを返す。
    pub async fn sync_cache(&self) -> anyhow::Result<usize> {
        self.call_cache("clear", self.cache.clear()).await?;
        // clear で保留中の invalidate も解消される
        self.pending_set().clear();

        let generation = self
            .call_cache("generation", self.cache.generation())
            .await?;
        let entries = self
            .read_store("list_all", || self.inner.list_all())
            .await?;
        let stored = self
            .call_cache("put_all", self.cache.put_all(&entries, generation))
            .await?;
        if !stored {
            debug!("cache sync raced with a concurrent write, mirror left for next read");
        }
        Ok(entries.len())
    }

    /// 保留中の invalidate を再試行したうえでキャッシュ全体を同期する。
    /// バックグラウンドの整合性回復タスクから定期的に呼ばれる。
    pub async fn reconcile(&self) -> anyhow::Result<usize> {
        let pending = self.pending_keys();
        if !pending.is_empty() {
            self.reconcile_pending(&pending).await;
        }
        self.sync_cache().await
    }

    /// キャッシュへの疎通を確認する。
    pub async fn cache_healthy(&self) -> bool {
        self.call_cache("ping", self.cache.ping()).await.is_ok()
    }

    /// invalidate が保留中の key の数。
    pub fn pending_count(&self) -> usize {
        self.pending_set().len()
    }

    fn pending_set(&self) -> MutexGuard<'_, HashSet<String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending_keys(&self) -> Vec<String> {
        self.pending_set().iter().cloned().collect()
    }

    fn is_pending(&self, key: &str) -> bool {
        self.pending_set().contains(key)
    }

    /// 保留中の invalidate を再試行する。すべて解消できた場合は true。
    async fn reconcile_pending(&self, keys: &[String]) -> bool {
        let mut all_cleared = true;
        for key in keys {
            if self
                .call_cache("invalidate", self.cache.invalidate(key))
                .await
                .is_ok()
            {
                self.pending_set().remove(key);
                debug!(key = %key, "pending cache invalidation reconciled");
            } else {
                all_cleared = false;
            }
        }
        all_cleared
    }

    /// 書き込み確定後に invalidate する。失敗しても書き込み自体は成功扱い。
    async fn invalidate_after_write(&self, key: &str) {
        if self
            .call_cache("invalidate", self.cache.invalidate(key))
            .await
            .is_err()
        {
            self.pending_set().insert(key.to_string());
            warn!(
                key = %key,
                "cache invalidation failed after durable write, key marked for reconciliation"
            );
        }
    }

    async fn call_store<T, Fut>(&self, operation: &'static str, fut: Fut) -> anyhow::Result<T>
    where
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.policy.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreTimeoutError {
                operation,
                timeout_ms: duration_millis(self.policy.store_timeout),
            }
            .into()),
        }
    }

    /// 冪等な読み込みはタイムアウト時に policy.read_retries 回まで再試行する。
    async fn read_store<T, F, Fut>(&self, operation: &'static str, f: F) -> anyhow::Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match self.call_store(operation, f()).await {
                Err(e) if is_store_timeout(&e) && attempt < self.policy.read_retries => {
                    attempt += 1;
                    warn!(operation, attempt, "store read timed out, retrying");
                }
                result => return result,
            }
        }
    }

    async fn call_cache<T, Fut>(&self, operation: &'static str, fut: Fut) -> Result<T, CacheError>
    where
        Fut: Future<Output = Result<T, CacheError>>,
    {
        let result = match tokio::time::timeout(self.policy.cache_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout),
        };
        if let Err(ref e) = result {
            warn!(operation, error = %e, "cache unavailable, bypassing cache");
        }
        result
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl EnvVariableRepository for CachedEnvVariableRepository {
    /// キャッシュヒット時はストアアクセスをスキップして即返却する。
    /// キャッシュミスの場合はストアから取得してキャッシュに格納してから返却する。
    async fn find_by_key(&self, key: &str) -> anyhow::Result<Option<EnvVariable>> {
        if self.is_pending(key) && !self.reconcile_pending(&[key.to_string()]).await {
            return self
                .read_store("find_by_key", || self.inner.find_by_key(key))
                .await;
        }

        match self.call_cache("get", self.cache.get(key)).await {
            Ok(Some(hit)) => return Ok(Some(hit)),
            Ok(None) => {}
            Err(_) => {
                return self
                    .read_store("find_by_key", || self.inner.find_by_key(key))
                    .await
            }
        }

        // 世代はストアを読む前に取得する
        let generation = self
            .call_cache("generation", self.cache.generation())
            .await
            .ok();
        let result = self
            .read_store("find_by_key", || self.inner.find_by_key(key))
            .await?;

        if let (Some(entry), Some(generation)) = (&result, generation) {
            // 格納に失敗してもストアの値を返せばよい
            let _ = self
                .call_cache("put", self.cache.put(entry, generation))
                .await;
        }

        Ok(result)
    }

    /// 全件ミラーが揃っていればキャッシュから返し、無ければストアから読み込んで格納する。
    /// ストアが利用できない場合は部分的な結果を返さずにエラーとする。
    async fn list_all(&self) -> anyhow::Result<Vec<EnvVariable>> {
        let pending = self.pending_keys();
        if !pending.is_empty() && !self.reconcile_pending(&pending).await {
            return self
                .read_store("list_all", || self.inner.list_all())
                .await;
        }

        match self.call_cache("list_all", self.cache.list_all()).await {
            Ok(Some(all)) => return Ok(all),
            Ok(None) => {}
            Err(_) => {
                return self
                    .read_store("list_all", || self.inner.list_all())
                    .await
            }
        }

        let generation = self
            .call_cache("generation", self.cache.generation())
            .await
            .ok();
        let entries = self
            .read_store("list_all", || self.inner.list_all())
            .await?;

        if let Some(generation) = generation {
            let _ = self
                .call_cache("put_all", self.cache.put_all(&entries, generation))
                .await;
        }

        Ok(entries)
    }

    /// update は inner に委譲し、成功時にキャッシュを invalidate する。
    /// 非冪等な操作のためタイムアウト時も自動リトライしない。
    async fn update(
        &self,
        key: &str,
        patch: &EnvVariablePatch,
    ) -> anyhow::Result<Option<EnvVariable>> {
        let result = self
            .call_store("update", self.inner.update(key, patch))
            .await?;

        if result.is_some() {
            self.invalidate_after_write(key).await;
        }

        Ok(result)
    }

    async fn create_if_absent(&self, entry: &EnvVariable) -> anyhow::Result<bool> {
        let inserted = self
            .call_store("create_if_absent", self.inner.create_if_absent(entry))
            .await?;

        if inserted {
            self.invalidate_after_write(&entry.key).await;
        }

        Ok(inserted)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.call_store("ping", self.inner.ping()).await
    }
}
