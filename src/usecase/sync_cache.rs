use std::sync::Arc;

use crate::adapter::repository::cached_env_variable_repository::CachedEnvVariableRepository;
use crate::domain::repository::is_store_timeout;
use crate::infrastructure::cache::CacheError;

/// SyncCacheError はキャッシュ同期に関するエラーを表す。
#[derive(Debug, thiserror::Error)]
pub enum SyncCacheError {
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("store timeout: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// SyncCacheUseCase はストアの全件でキャッシュを作り直すユースケース。
pub struct SyncCacheUseCase {
    repo: Arc<CachedEnvVariableRepository>,
}

impl SyncCacheUseCase {
    pub fn new(repo: Arc<CachedEnvVariableRepository>) -> Self {
        Self { repo }
    }

    /// 同期した件数を返す。
    pub async fn execute(&self) -> Result<usize, SyncCacheError> {
        self.repo.sync_cache().await.map_err(|e| {
            if e.downcast_ref::<CacheError>().is_some() {
                SyncCacheError::CacheUnavailable(e.to_string())
            } else if is_store_timeout(&e) {
                SyncCacheError::Timeout(e.to_string())
            } else {
                SyncCacheError::Internal(e.to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::repository::env_variable_memory::InMemoryEnvVariableRepository;
    use crate::domain::entity::env_variable::EnvVariable;
    use crate::domain::repository::env_variable_repository::MockEnvVariableRepository;
    use crate::infrastructure::cache::{
        EnvVariableCache, InMemoryEnvVariableCache, MockEnvVariableCache,
    };

    #[tokio::test]
    async fn test_sync_cache_success() {
        let store = Arc::new(InMemoryEnvVariableRepository::with_entries(vec![
            EnvVariable::new("FEATURE_X", "off", None),
            EnvVariable::new("API_URL", "http://localhost:8000", None),
        ]));
        let cache = Arc::new(InMemoryEnvVariableCache::new(100, 60));
        let repo = Arc::new(CachedEnvVariableRepository::new(store, cache.clone()));

        let uc = SyncCacheUseCase::new(repo);
        assert_eq!(uc.execute().await.unwrap(), 2);
        assert_eq!(cache.list_all().await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sync_cache_unavailable() {
        let mut mock_cache = MockEnvVariableCache::new();
        mock_cache
            .expect_clear()
            .returning(|| Err(CacheError::Unavailable("connection refused".to_string())));
        let repo = Arc::new(CachedEnvVariableRepository::new(
            Arc::new(InMemoryEnvVariableRepository::new()),
            Arc::new(mock_cache),
        ));

        let uc = SyncCacheUseCase::new(repo);
        assert!(matches!(
            uc.execute().await.unwrap_err(),
            SyncCacheError::CacheUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_sync_cache_store_error() {
        let mut mock_repo = MockEnvVariableRepository::new();
        mock_repo
            .expect_list_all()
            .returning(|| Err(anyhow::anyhow!("connection refused")));
        let repo = Arc::new(CachedEnvVariableRepository::new(
            Arc::new(mock_repo),
            Arc::new(InMemoryEnvVariableCache::new(100, 60)),
        ));

        let uc = SyncCacheUseCase::new(repo);
        match uc.execute().await.unwrap_err() {
            SyncCacheError::Internal(msg) => assert!(msg.contains("connection refused")),
            e => panic!("unexpected error: {:?}", e),
        }
    }
}
