use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::adapter::repository::cached_env_variable_repository::CachedEnvVariableRepository;

/// CacheReconciler は保留中の invalidate を再試行し、キャッシュをストアから再同期する
/// バックグラウンドタスク。
pub struct CacheReconciler {
    repo: Arc<CachedEnvVariableRepository>,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl CacheReconciler {
    pub fn new(repo: Arc<CachedEnvVariableRepository>, interval: Duration) -> Self {
        Self {
            repo,
            interval,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let repo = self.repo.clone();
        let interval = self.interval;
        let token = self.cancel_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        match repo.reconcile().await {
                            Ok(count) => tracing::debug!(count, "cache reconciled"),
                            Err(e) => tracing::error!("cache reconcile error: {}", e),
                        }
                    }
                }
            }
        })
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }
}
